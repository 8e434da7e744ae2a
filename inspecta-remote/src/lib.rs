//! INSPECTA Remote - Remote Data Service Client
//!
//! The [`RemoteDataService`] trait is the seam between the synchronization
//! engine and the network. [`RestRemoteClient`] implements it over a
//! PostgREST-style HTTP API.

pub mod rest;
pub mod service;

pub use rest::{classify_status, parse_content_range_total, RestClientConfig, RestRemoteClient};
pub use service::RemoteDataService;
