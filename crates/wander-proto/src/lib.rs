//! wander-proto: wire protocol for the travel planner service
//!
//! This crate decodes the planner's framed event stream into typed events
//! and provides the HTTP client that opens stream and resume sessions.

pub mod client;
pub mod decoder;
pub mod error;
pub mod event;
pub mod types;

pub use client::PlannerClient;
pub use decoder::{FrameDecoder, decode_events};
pub use error::{Error, Result};
pub use event::*;
pub use types::*;
