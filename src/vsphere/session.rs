//! # vSphere API Session
//!
//! Opens an authenticated session with `POST /api/session` (HTTP basic auth)
//! and closes it with `DELETE /api/session`. The returned session id is sent
//! with every subsequent request in the `vmware-api-session-id` header.
//!
//! A [`Session`] closes itself when dropped, so the remote session is released
//! on normal program exit without explicit bookkeeping.

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use tracing::{debug, info, warn};

use crate::error::{DeployError, Result};
use crate::vsphere::ConnectionParams;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// An authenticated session against the management endpoint.
///
/// `Session` is `Send + Sync`: the session id never changes after `connect`
/// and `reqwest::blocking::Client` is safe to use from several threads.
pub struct Session {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl Session {
    /// Authenticates against the endpoint described by `params`.
    ///
    /// Rejected credentials and unreachable endpoints are both reported as
    /// [`DeployError::Authentication`].
    pub fn connect(params: &ConnectionParams) -> Result<Session> {
        let http = crate::client::blocking_client(params.skip_verification)?;
        let base_url = params.base_url();

        let res = http
            .post(format!("{}/api/session", base_url))
            .basic_auth(&params.username, Some(&params.password))
            .send()
            .map_err(|e| {
                DeployError::Authentication(format!("cannot reach {}: {}", base_url, e))
            })?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DeployError::Authentication(format!(
                "credentials for {} rejected by {} ({})",
                params.username, base_url, status
            )));
        }
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(DeployError::Authentication(format!(
                "{} returned {}: {}",
                base_url, status, body
            )));
        }

        // The body is the session id as a JSON string.
        let token: String = res.json().map_err(|e| {
            DeployError::Authentication(format!("invalid session response: {}", e))
        })?;
        info!(server = %base_url, user = %params.username, "connected");

        Ok(Session {
            http,
            base_url,
            token: Some(token),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.token.is_some()
    }

    /// Starts a request to `path` (relative to the base URL) carrying the
    /// session header.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header(SESSION_HEADER, token),
            None => builder,
        }
    }

    /// Closes the session. Calling it again is a no-op.
    pub fn disconnect(&mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };
        let res = self
            .http
            .delete(format!("{}/api/session", self.base_url))
            .header(SESSION_HEADER, &token)
            .send()?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(DeployError::Api {
                status: status.as_u16(),
                error_type: "SESSION".to_string(),
                message: body,
            });
        }
        debug!(server = %self.base_url, "disconnected");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best-effort: the process is usually exiting here.
        if let Err(e) = self.disconnect() {
            warn!(server = %self.base_url, error = %e, "failed to close session");
        }
    }
}
