//! Typed client for the registration backend's REST endpoints.

pub mod types;

mod client;

pub use client::BackendClient;
