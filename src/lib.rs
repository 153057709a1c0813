//! Image Tools Server Library
//!
//! Exposes the router and its components so the binary, the integration
//! tests and the benchmarks share one implementation.
//!
//! # Modules
//!
//! - `transform`: raster transforms and image-to-PDF
//! - `artifacts`: transient output storage and the expiry sweeper
//! - `rate_limit`: per-client request limiting
//! - `routes`: HTTP handlers and router assembly

pub mod artifacts;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod transform;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
