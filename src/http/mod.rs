//! HTTP client module
//!
//! Provides the authenticated HTTP client used for every backend call.
//!
//! # Features
//!
//! - **Bearer Auth**: Current access token attached to each request
//! - **Refresh on 401**: One shared refresh, then a single replay per request
//! - **Typed Errors**: 401, other statuses and timeouts mapped to `Error`

mod client;

pub use client::{
    HttpClient, HttpClientBuilder, HttpClientConfig, HttpClientConfigBuilder, OutgoingRequest,
    RequestConfig,
};

#[cfg(test)]
mod tests;
