//! Shared HTTP plumbing for the ePO and Case API clients.
//!
//! Both remote APIs are reached through a `reqwest::Client` built here with
//! explicit timeouts. Certificate validation is on unless the corresponding
//! config section opts out; opting out is logged at warn level on every
//! client construction so the insecure mode never goes unnoticed.
//!
//! Responses are read as text before the status is checked. Neither API's
//! error bodies survive `error_for_status()`, and both carry the only useful
//! diagnostics, so a non-success status becomes [`SrpError::Api`] with the
//! body attached.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{Result, SrpError};

/// Connect timeout: TCP + TLS handshake only.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout. `system.wakeupAgent` waits for the agent to
/// answer before ePO replies, which takes close to a minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Builds a `reqwest::Client` for one remote API.
///
/// `api` names the API in the insecure-mode warning.
pub(crate) fn build_http_client(api: &str, accept_invalid_certs: bool) -> Result<Client> {
    if accept_invalid_certs {
        tracing::warn!(api, "TLS certificate validation is disabled");
    }
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(SrpError::Network)
}

/// Reads the body of `resp` as text, failing with [`SrpError::Api`] on a
/// non-success status.
pub(crate) async fn text_or_api_error(resp: Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(SrpError::Api { status, body });
    }
    Ok(body)
}
