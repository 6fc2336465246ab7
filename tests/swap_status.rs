use anyhow::Result;
use chrono::{TimeZone as _, Utc};
use ln_chain_swap::SwapError;
use ln_chain_swap::swap::{SwapStateUpdate, classify_status};

const AT_NS: u64 = 1_700_000_000_123_456_789;

fn update(state: &str) -> SwapStateUpdate {
    SwapStateUpdate {
        state: Some(state.to_string()),
        timestamp_ns: Some(AT_NS),
    }
}

#[test]
fn success_is_claimed_and_confirmed() -> Result<()> {
    let status = classify_status(&update("SUCCESS"))?;

    let expected_at = Utc.timestamp_opt(1_700_000_000, 123_456_789).single();
    assert_eq!(Some(status.at), expected_at);
    assert_eq!(status.is_broadcast, Some(true));
    assert_eq!(status.is_claimed, Some(true));
    assert_eq!(status.is_confirmed, Some(true));
    assert_eq!(status.is_failed, Some(false));
    assert_eq!(status.is_known, Some(true));
    assert_eq!(status.is_refunded, Some(false));
    Ok(())
}

#[test]
fn server_prefix_is_ignored() -> Result<()> {
    assert_eq!(
        classify_status(&update("SERVER_HTLC_PUBLISHED"))?,
        classify_status(&update("HTLC_PUBLISHED"))?
    );
    Ok(())
}

#[test]
fn timeout_published_is_refunded_failure() -> Result<()> {
    let status = classify_status(&update("TIMEOUT_PUBLISHED"))?;
    assert_eq!(status.is_failed, Some(true));
    assert_eq!(status.is_refunded, Some(true));
    assert_eq!(status.is_claimed, Some(false));
    Ok(())
}

#[test]
fn failure_family_is_failed() -> Result<()> {
    for state in ["FAILED", "FAILED_TO_PAY", "SERVER_UNEXPECTED_FAILURE"] {
        let status = classify_status(&update(state))?;
        assert_eq!(status.is_failed, Some(true), "{state}");
        assert_eq!(status.is_broadcast, Some(false), "{state}");
    }
    Ok(())
}

#[test]
fn unknown_state_only_carries_time() -> Result<()> {
    let status = classify_status(&update("SOMETHING_NEW"))?;
    assert!(status.is_known.is_none());
    assert!(status.is_claimed.is_none());

    let json = serde_json::to_value(&status)?;
    assert_eq!(
        json,
        serde_json::json!({ "at": "2023-11-14T22:13:20.123456789Z" })
    );
    Ok(())
}

#[test]
fn missing_fields_are_rejected() {
    let no_state = SwapStateUpdate {
        state: None,
        timestamp_ns: Some(AT_NS),
    };
    let no_time = SwapStateUpdate {
        state: Some("SUCCESS".to_string()),
        timestamp_ns: None,
    };
    for update in [no_state, no_time] {
        assert!(matches!(
            classify_status(&update),
            Err(SwapError::MissingSwapStateOrTimestamp)
        ));
    }
}
