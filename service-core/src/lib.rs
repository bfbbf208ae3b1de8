//! service-core: error type, configuration, tracing and HTTP middleware
//! shared by the conversion services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
