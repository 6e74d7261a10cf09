//! API client module
//!
//! HTTP client for the remote email verification service.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{ApiClient, ChunkStream, StatusSource};
pub use types::*;
