//! Realtime endpoint URL construction.

use url::Url;

use crate::{AuthToken, errors::ProtocolError};

/// Socket URL for the realtime endpoint.
///
/// The API base scheme is mapped to its websocket counterpart (`http` to
/// `ws`, `https` to `wss`) and `/ws/{token}` is appended to its path. Query
/// and fragment of the base are dropped.
///
/// # Errors
///
/// - [`ProtocolError::InvalidUrl`] if `api_base` does not parse or cannot
///   carry a path
/// - [`ProtocolError::UnsupportedScheme`] for schemes other than
///   `http`, `https`, `ws` and `wss`
pub fn realtime_url(api_base: &str, token: &AuthToken) -> Result<Url, ProtocolError> {
    let mut url = Url::parse(api_base).map_err(|e| ProtocolError::InvalidUrl(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ProtocolError::UnsupportedScheme(other.to_owned())),
    };
    url.set_scheme(scheme)
        .map_err(|()| ProtocolError::InvalidUrl(format!("cannot switch {api_base} to {scheme}")))?;

    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| ProtocolError::InvalidUrl(format!("{api_base} cannot be a base")))?
        .pop_if_empty()
        .push("ws")
        .push(token.expose());

    Ok(url)
}
