//! # ModKit
//!
//! Shared building blocks for the service's modules:
//!
//! - [`api`]: response envelope, error mapping, list-query extraction
//! - [`auth`]: bearer-token gate in front of protected routers
//! - [`jobs`]: periodic job scheduling
//! - [`context`]: the application context handed to every module at startup

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod api;
pub mod auth;
pub mod context;
pub mod jobs;

pub use api::{ApiError, ApiResult, Envelope, JsonBytes, ListParams};
pub use context::AppContext;
