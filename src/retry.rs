use crate::error::AppError;
use crate::metrics;
use crate::pricing::PriceSource;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// How many extra attempts a transient failure earns
pub const MAX_RETRIES: u32 = 1;

/// Run one upstream lookup under a time budget, retrying transient failures once
///
/// Each attempt gets the full `timeout_duration`. Non-transient errors (4xx,
/// unparsable bodies, missing prices) are returned after the first attempt.
pub async fn execute_with_retry<F, Fut, T>(
    source: PriceSource,
    timeout_duration: Duration,
    request_fn: F,
) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;

    loop {
        let result = match timeout(timeout_duration, request_fn()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout {
                seconds: timeout_duration.as_secs(),
            }),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_RETRIES && is_transient(&e) => {
                attempt += 1;
                metrics::record_retry(source);
                tracing::warn!(
                    source = %source,
                    attempt,
                    error = %e,
                    "Transient pricing failure, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Determine if an error is worth one more attempt
///
/// ## Transient (returns true):
/// - Connection failures (TCP timeout, connection refused, DNS failures)
/// - Request timeouts
/// - HTTP 5xx and 429 responses
///
/// ## Not transient (returns false):
/// - Other HTTP 4xx errors (bad token, unknown product)
/// - Malformed or incomplete upstream payloads
/// - Local validation/config errors
pub fn is_transient(error: &AppError) -> bool {
    match error {
        AppError::HttpRequest(e) => {
            if e.is_connect() || e.is_timeout() {
                return true;
            }
            if let Some(status) = e.status() {
                return status.is_server_error();
            }
            e.is_request()
        }

        AppError::UpstreamError { status, .. } => {
            status.is_server_error() || status.as_u16() == 429
        }

        AppError::Timeout { .. } => true,

        AppError::Validation(_)
        | AppError::NotFound(_)
        | AppError::QuoteMismatch(_)
        | AppError::NoPricingData(_)
        | AppError::Overflow(_)
        | AppError::Config(_)
        | AppError::Catalog(_)
        | AppError::Export(_)
        | AppError::InvalidResponse(_) => false,
    }
}
