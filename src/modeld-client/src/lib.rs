//! Client for the modeld inference service.
//!
//! This crate submits inference requests, consumes the NDJSON token stream
//! the service answers with, and polls health/readiness endpoints.
//!
//! - [`StreamDecoder`] splits arriving body chunks into complete lines
//! - [`ResultReducer`] folds those lines into the final text
//! - [`RequestController`] runs one request at a time and publishes its state
//! - [`HealthPoller`] waits for an endpoint to report an expected status

mod client;
pub mod config;
mod controller;
mod decoder;
mod error;
pub mod http_client;
mod models;
mod poller;
mod reducer;

pub use client::InferClient;
pub use config::{ClientConfig, EndpointPaths, PollSettings};
pub use controller::{
    InferOutcome, InferTask, RequestController, RequestLifecycleState, RequestSnapshot,
};
pub use decoder::{StreamDecoder, decode_all};
pub use error::{ClientError, Result};
pub use models::{InferRequest, ModelsListing, ProbeResponse, StatusReport};
pub use poller::{HealthPollOutcome, HealthPoller, HttpProbe, NO_RESPONSE, Probe, poll};
pub use reducer::{ResultReducer, StreamEvent, reduce_lines};
