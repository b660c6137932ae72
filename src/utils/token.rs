// src/utils/token.rs

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::Utc;

use crate::config::RESET_TOKEN_TTL_SECS;

/// Number of random bytes in a reset token. Rendered as twice as many hex chars.
pub const RESET_TOKEN_BYTES: usize = 20;

/// A freshly issued password reset token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    /// Unix milliseconds.
    pub expires_at: i64,
}

/// Issues a reset token valid for one hour from `now_ms`.
pub fn issue_reset_token(now_ms: i64) -> ResetToken {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    ResetToken {
        token: hex::encode(bytes),
        expires_at: now_ms + RESET_TOKEN_TTL_SECS * 1000,
    }
}

/// Current time in Unix milliseconds, the unit reset expiries are stored in.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
