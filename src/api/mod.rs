//! Remote access to the task service.

pub mod client;
pub mod service;

pub use client::{ApiConfig, HttpTaskApi, normalize_base_url};
pub use service::{RemoteResult, TaskApi};
