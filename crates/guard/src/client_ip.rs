use std::net::SocketAddr;

/// Key used for clients whose address cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the client address used to key rate buckets and block records.
///
/// The first entry of `X-Forwarded-For` wins when present, otherwise the
/// transport peer address is used.
pub fn resolve(forwarded_for: Option<&str>, peer: Option<SocketAddr>) -> String {
    let forwarded = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());

    match (forwarded, peer) {
        (Some(first), _) => first.to_owned(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => UNKNOWN_CLIENT.to_owned(),
    }
}
