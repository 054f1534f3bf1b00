//! Shared reqwest error and status mapping.

use pullbridge_core::{AppError, AppResult};
use serde_json::Value;

/// Maps a reqwest failure to a transport error with context.
pub(crate) fn transport_error(context: &str, error: &reqwest::Error) -> AppError {
    let kind = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    AppError::Transport(format!("{context} {kind}: {error}"))
}

/// Rejects non-2xx responses with an HTTP status error.
pub(crate) fn ensure_success(response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(AppError::HttpStatus {
        status: status.as_u16(),
        url: response.url().to_string(),
    })
}

/// Reads the full body and parses it as JSON.
///
/// Read failures are transport errors; `on_invalid_json` builds the error for
/// a body that is not JSON.
pub(crate) async fn read_json(
    response: reqwest::Response,
    context: &str,
    on_invalid_json: impl FnOnce(String) -> AppError,
) -> AppResult<Value> {
    let body = response
        .bytes()
        .await
        .map_err(|error| transport_error(context, &error))?;

    serde_json::from_slice(&body)
        .map_err(|error| on_invalid_json(format!("{context} returned invalid JSON: {error}")))
}
