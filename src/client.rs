use std::time::Duration;

use reqwest::blocking::Client;

/// Per-request timeout for every call to the management endpoint.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Builds the blocking HTTP client used for one API session.
///
/// `skip_verification` disables TLS certificate checks, which lab endpoints
/// with self-signed certificates need.
pub fn blocking_client(skip_verification: bool) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(skip_verification)
        .build()
}
