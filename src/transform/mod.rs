//! Image transforms
//!
//! Thin wrappers over the `image` and `lopdf` crates:
//! - `raster`: convert, compress and resize
//! - `pdf`: single-page image-to-PDF
//!
//! Every transform is CPU-bound and runs on tokio's blocking pool under a
//! timeout, so a large upload never stalls other requests.

pub mod pdf;
pub mod raster;
pub mod types;

use std::time::Duration;

pub use pdf::image_to_pdf;
pub use raster::{compress, convert, resize};
pub use types::*;

/// Run a blocking transform off the async runtime, bounded by `timeout`.
///
/// On timeout the worker thread is left to finish on its own; its result is
/// discarded.
pub async fn run_blocking<F>(timeout: Duration, job: F) -> Result<Vec<u8>, TransformError>
where
    F: FnOnce() -> Result<Vec<u8>, TransformError> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(job)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(TransformError::Worker(join_error.to_string())),
        Err(_) => Err(TransformError::TimedOut(timeout.as_secs())),
    }
}
