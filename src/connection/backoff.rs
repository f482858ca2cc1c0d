//! Reconnect policy and close-code classification

use serde::Serialize;
use std::time::Duration;

/// Normal closure; never reconnects
pub const NORMAL_CLOSURE: u16 = 1000;

/// Reported when the connection dropped without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close frame carried no status code
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Close codes the server uses to reject the access token
pub const DEFAULT_AUTH_CLOSE_CODES: [u16; 3] = [1008, 4001, 4003];

/// How a close code affects reconnection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseDisposition {
    /// Code 1000: stay disconnected
    Normal,
    /// Token rejected: reset the attempt counter, then retry
    AuthFailure,
    /// Anything else: retry with backoff
    Abnormal,
}

impl CloseDisposition {
    pub fn classify(code: u16, auth_codes: &[u16]) -> Self {
        if code == NORMAL_CLOSURE {
            CloseDisposition::Normal
        } else if auth_codes.contains(&code) {
            CloseDisposition::AuthFailure
        } else {
            CloseDisposition::Abnormal
        }
    }
}

/// Exponential backoff with a cap and an attempt limit
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given 1-based attempt: `min(base * 2^(attempt-1), max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let base_ms = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}
