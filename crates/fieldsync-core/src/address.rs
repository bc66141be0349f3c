//! Channel address building.
//!
//! Live channels share the host of the REST API. The scheme is mapped
//! `http → ws`, `https → wss`, and a bare host defaults to `wss`. The bearer
//! token travels as a `token` query parameter because browsers cannot set
//! headers on a WebSocket upgrade and the server accepts the same form.

use url::Url;

use crate::SyncError;

/// Default path of the pickup feed channel.
pub const DEFAULT_PICKUP_PATH: &str = "/ws/pickups/";

/// Path of the chat channel for `room`.
pub fn chat_path(room: &str) -> String {
    format!("/ws/chat/{room}/")
}

/// Build the channel URL for `path` on the server at `base`.
///
/// # Errors
///
/// - [`SyncError::MissingToken`] if `token` is absent or blank
/// - [`SyncError::InvalidUrl`] if `base` cannot be parsed or uses a scheme
///   other than http, https, ws or wss
pub fn channel_url(base: &str, path: &str, token: Option<&str>) -> Result<String, SyncError> {
    let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or(SyncError::MissingToken)?;
    let invalid =
        |reason: &str| SyncError::InvalidUrl { url: base.to_string(), reason: reason.into() };

    let trimmed = base.trim().trim_end_matches('/');
    let with_scheme =
        if trimmed.contains("://") { trimmed.to_string() } else { format!("wss://{trimmed}") };
    let mut url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("unsupported scheme")),
    };
    url.set_scheme(scheme).map_err(|()| invalid("unsupported scheme"))?;

    let prefix = url.path().trim_end_matches('/').to_string();
    let path = path.trim_start_matches('/');
    url.set_path(&format!("{prefix}/{path}"));
    url.set_query(None);
    url.query_pairs_mut().append_pair("token", token);

    Ok(url.into())
}
