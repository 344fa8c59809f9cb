//! Session tokens presented to the server as the WebSocket sub-protocol.

use uuid::Uuid;

/// Build a per-connection token of the form `<client_id>-<random fraction>`.
///
/// Uniqueness is best-effort. The server only uses it to tell concurrent
/// sessions of the same client apart.
pub fn session_token(client_id: &str) -> String {
    format!("{}-{}", client_id, random_fraction())
}

/// Uniform value in `[0, 1)` from the low 53 bits of a v4 UUID, which sit
/// below the version and variant fields
fn random_fraction() -> f64 {
    const MANTISSA: u64 = 1 << 53;
    let bits = Uuid::new_v4().as_u128() as u64 & (MANTISSA - 1);
    bits as f64 / MANTISSA as f64
}
