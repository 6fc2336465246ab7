use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SwapError};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A state notification as received from the swap service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStateUpdate {
    pub state: Option<String>,
    pub timestamp_ns: Option<u64>,
}

/// Normalized view of a swap's progress.
///
/// Only `at` is set for states this crate does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStatus {
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_broadcast: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_claimed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_confirmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_failed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_known: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_refunded: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
struct Flags {
    broadcast: bool,
    claimed: bool,
    confirmed: bool,
    failed: bool,
    known: bool,
    refunded: bool,
}

const fn flags(
    broadcast: bool,
    claimed: bool,
    confirmed: bool,
    failed: bool,
    refunded: bool,
) -> Flags {
    Flags {
        broadcast,
        claimed,
        confirmed,
        failed,
        known: true,
        refunded,
    }
}

fn state_flags(state: &str) -> Option<Flags> {
    let state = state.strip_prefix("SERVER_").unwrap_or(state);
    let found = match state {
        "INITIATED" => flags(false, false, false, false, false),
        "HTLC_PUBLISHED" => flags(true, false, false, false, false),
        "HTLC_CONFIRMED" | "PREIMAGE_REVEALED" | "INVOICE_SETTLED" => {
            flags(true, false, true, false, false)
        }
        "SUCCESS" => flags(true, true, true, false, false),
        "TIMEOUT_PUBLISHED" => flags(true, false, true, true, true),
        "FAILED" | "UNEXPECTED_FAILURE" => flags(false, false, false, true, false),
        s if s.starts_with("FAILED_") => flags(false, false, false, true, false),
        _ => return None,
    };
    Some(found)
}

pub fn classify_status(update: &SwapStateUpdate) -> Result<SwapStatus> {
    let (Some(state), Some(timestamp_ns)) = (update.state.as_deref(), update.timestamp_ns) else {
        return Err(SwapError::MissingSwapStateOrTimestamp);
    };

    let secs = i64::try_from(timestamp_ns / NANOS_PER_SEC)
        .map_err(|_| SwapError::MissingSwapStateOrTimestamp)?;
    let nanos = (timestamp_ns % NANOS_PER_SEC) as u32;
    let at = DateTime::from_timestamp(secs, nanos).ok_or(SwapError::MissingSwapStateOrTimestamp)?;

    let Some(f) = state_flags(state) else {
        tracing::debug!(state, "unrecognized swap state");
        return Ok(SwapStatus {
            at,
            is_broadcast: None,
            is_claimed: None,
            is_confirmed: None,
            is_failed: None,
            is_known: None,
            is_refunded: None,
        });
    };

    Ok(SwapStatus {
        at,
        is_broadcast: Some(f.broadcast),
        is_claimed: Some(f.claimed),
        is_confirmed: Some(f.confirmed),
        is_failed: Some(f.failed),
        is_known: Some(f.known),
        is_refunded: Some(f.refunded),
    })
}
