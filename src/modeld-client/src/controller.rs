//! Request lifecycle controller.
//!
//! A [`RequestController`] owns at most one in-flight inference request.
//! `submit` swaps the current [`CancellationToken`] for a fresh one and bumps
//! the request generation before the new task is spawned, with no await in
//! between. Every snapshot write from a request task is checked against both,
//! inside the channel's write lock, so a superseded request can never touch
//! the published state.
//!
//! ```text
//! Idle --submit--> Requesting --stream ends--> Success
//!                  Requesting --non-2xx | transport error--> Error
//! Success | Error --submit--> Requesting
//! ```

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::InferClient;
use crate::decoder::StreamDecoder;
use crate::error::ClientError;
use crate::models::InferRequest;
use crate::reducer::{ResultReducer, StreamEvent};

/// Lifecycle of the controller's current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestLifecycleState {
    #[default]
    Idle,
    Requesting,
    Success,
    Error,
}

impl RequestLifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RequestLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observable state of the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Submit counter this snapshot belongs to.
    pub generation: u64,
    pub state: RequestLifecycleState,
    /// Decoded lines in arrival order.
    pub streamed_lines: Vec<String>,
    /// Running text while requesting, final text once terminal.
    pub result_text: String,
    /// Set on the terminal transition.
    pub latency_ms: Option<u64>,
}

/// Terminal result of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferOutcome {
    pub state: RequestLifecycleState,
    pub result_text: String,
    pub latency_ms: u64,
    #[serde(skip)]
    pub error: Option<ClientError>,
}

impl InferOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RequestLifecycleState::Success
    }
}

/// Handle to a submitted request.
#[derive(Debug)]
pub struct InferTask {
    generation: u64,
    handle: JoinHandle<Option<InferOutcome>>,
}

impl InferTask {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the request to finish.
    ///
    /// Returns `None` when the request was superseded or cancelled before it
    /// reached a terminal state.
    pub async fn outcome(self) -> Option<InferOutcome> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(generation = self.generation, error = %e, "Request task failed");
                None
            }
        }
    }
}

/// Owns the lifecycle of one logical inference request at a time.
pub struct RequestController {
    client: InferClient,
    state: Arc<watch::Sender<RequestSnapshot>>,
    generation: u64,
    current: Option<CancellationToken>,
}

impl RequestController {
    pub fn new(client: InferClient) -> Self {
        let (state, _) = watch::channel(RequestSnapshot::default());
        Self {
            client,
            state: Arc::new(state),
            generation: 0,
            current: None,
        }
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<RequestSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RequestSnapshot {
        self.state.borrow().clone()
    }

    pub fn state(&self) -> RequestLifecycleState {
        self.state.borrow().state
    }

    /// Start a new request, superseding any request still in flight.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&mut self, request: InferRequest) -> InferTask {
        self.invalidate_current();

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.current = Some(token.clone());

        self.state.send_replace(RequestSnapshot {
            generation,
            state: RequestLifecycleState::Requesting,
            ..RequestSnapshot::default()
        });
        let started = Instant::now();

        info!(generation, model = ?request.model, "Submitting inference request");
        let publisher = Publisher {
            state: Arc::clone(&self.state),
            generation,
            token,
        };
        let handle = tokio::spawn(run_request(
            self.client.clone(),
            request,
            publisher,
            started,
        ));

        InferTask { generation, handle }
    }

    /// Abandon the in-flight request, if any, and return to `Idle`.
    ///
    /// A request that already reached a terminal state is left as is.
    pub fn cancel(&mut self) {
        let in_flight = self.state() == RequestLifecycleState::Requesting;
        self.invalidate_current();
        if in_flight {
            self.generation += 1;
            debug!(generation = self.generation, "Request cancelled");
            self.state.send_replace(RequestSnapshot {
                generation: self.generation,
                ..RequestSnapshot::default()
            });
        }
    }

    fn invalidate_current(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

impl Drop for RequestController {
    fn drop(&mut self) {
        self.invalidate_current();
    }
}

/// Write access to the snapshot for one request generation.
struct Publisher {
    state: Arc<watch::Sender<RequestSnapshot>>,
    generation: u64,
    token: CancellationToken,
}

impl Publisher {
    /// Apply `f` only while this request is still the current one.
    fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut RequestSnapshot),
    {
        if self.token.is_cancelled() {
            return false;
        }
        let generation = self.generation;
        self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            f(snapshot);
            true
        })
    }

    /// Fold one decoded line and republish the running text.
    fn line(&self, reducer: &mut ResultReducer, line: String) -> bool {
        if let StreamEvent::Opaque { .. } = reducer.apply(&line) {
            debug!(generation = self.generation, line = %line, "Opaque stream line");
        }
        let text = reducer.text().to_string();
        self.update(move |snapshot| {
            snapshot.streamed_lines.push(line);
            snapshot.result_text = text;
        })
    }

    fn finish(
        &self,
        state: RequestLifecycleState,
        result_text: String,
        error: Option<ClientError>,
        started: Instant,
    ) -> Option<InferOutcome> {
        let latency_ms = started.elapsed().as_millis() as u64;
        let applied = self.update(|snapshot| {
            snapshot.state = state;
            snapshot.result_text.clone_from(&result_text);
            snapshot.latency_ms = Some(latency_ms);
        });
        if !applied {
            return None;
        }
        info!(generation = self.generation, state = %state, latency_ms, "Request finished");
        Some(InferOutcome {
            state,
            result_text,
            latency_ms,
            error,
        })
    }

    fn fail(&self, error: ClientError, started: Instant) -> Option<InferOutcome> {
        warn!(generation = self.generation, error = %error, "Request failed");
        self.finish(
            RequestLifecycleState::Error,
            error.to_string(),
            Some(error),
            started,
        )
    }
}

async fn run_request(
    client: InferClient,
    request: InferRequest,
    publisher: Publisher,
    started: Instant,
) -> Option<InferOutcome> {
    let token = publisher.token.clone();
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(generation = publisher.generation, "Request superseded");
            None
        }
        outcome = stream_response(&client, &request, &publisher, started) => outcome,
    }
}

async fn stream_response(
    client: &InferClient,
    request: &InferRequest,
    publisher: &Publisher,
    started: Instant,
) -> Option<InferOutcome> {
    let response = match client.start_infer(request).await {
        Ok(response) => response,
        Err(e) => return publisher.fail(e, started),
    };

    let mut decoder = StreamDecoder::new();
    let mut reducer = ResultReducer::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return publisher.fail(ClientError::from_reqwest(e), started),
        };
        for line in decoder.push(&chunk) {
            if !publisher.line(&mut reducer, line) {
                return None;
            }
        }
    }
    if let Some(line) = decoder.finish()
        && !publisher.line(&mut reducer, line)
    {
        return None;
    }

    if !reducer.is_complete() {
        debug!(generation = publisher.generation, "Stream ended without a terminal line");
    } else if let Some(StreamEvent::Terminal {
        message: Some(message),
        ..
    }) = reducer.terminal()
    {
        debug!(generation = publisher.generation, message = %message, "Stream terminated");
    }

    publisher.finish(
        RequestLifecycleState::Success,
        reducer.finish(),
        None,
        started,
    )
}
