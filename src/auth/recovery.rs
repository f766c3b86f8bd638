//! Password-recovery OTP state machine.
//!
//! A user is in one of three states, tracked by the `(otp, otp_expires_at)`
//! pair on the record: no open request (no code stored), pending
//! verification (code stored and not yet expired), or expired (code stored
//! but past its window; treated the same as no open request, the stale code
//! just stays in place until overwritten or consumed).

use rand::{rngs::OsRng, Rng};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid or expired OTP")]
pub struct InvalidOrExpired;

/// A freshly issued one-time code with its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOtp {
    pub code: String,
    pub expires_at: OffsetDateTime,
}

impl PendingOtp {
    /// Issues a new code valid until `now + ttl`. Issuing always overwrites
    /// any prior pending code; there is never more than one valid code per
    /// user.
    pub fn issue(now: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            code: generate_code(),
            expires_at: now + ttl,
        }
    }
}

/// Six-digit code drawn uniformly from [100000, 999999] using the OS CSPRNG.
pub fn generate_code() -> String {
    OsRng.gen_range(100_000..=999_999u32).to_string()
}

/// Checks a supplied code against the stored pending state.
///
/// This is an idempotent probe: it does not consume the code, so a verified
/// code remains usable for the subsequent reset call. The code is valid
/// while `now <= expires_at` (boundary inclusive). The comparison is
/// constant-time.
pub fn validate(
    stored: Option<(&str, OffsetDateTime)>,
    supplied: &str,
    now: OffsetDateTime,
) -> Result<(), InvalidOrExpired> {
    let (code, expires_at) = stored.ok_or(InvalidOrExpired)?;
    if now > expires_at {
        return Err(InvalidOrExpired);
    }
    if bool::from(code.as_bytes().ct_eq(supplied.as_bytes())) {
        Ok(())
    } else {
        Err(InvalidOrExpired)
    }
}
