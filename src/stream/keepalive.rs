use crate::model::StreamMessage;

/// Literal reply to a server `ping` frame. Sent as raw text, not JSON.
pub const KEEPALIVE_ACK: &str = "pong";

/// Answer keepalive probes before they reach the router.
///
/// Calls `reply` with [`KEEPALIVE_ACK`] and returns `true` when `message` is a
/// ping, which the caller must then drop. Stateless: no timers, no liveness
/// tracking.
pub fn intercept<F>(message: &StreamMessage, reply: F) -> bool
where
    F: FnOnce(&'static str),
{
    if matches!(message, StreamMessage::Ping { .. }) {
        reply(KEEPALIVE_ACK);
        true
    } else {
        false
    }
}
