use std::str::FromStr as _;

use anyhow::{Context as _, Result};
use bitcoin::hashes::{Hash as _, hash160, sha256};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use ln_chain_swap::SwapError;
use ln_chain_swap::htlc::template::{is_script_matching_template, v1_template, v2_template};
use ln_chain_swap::htlc::{
    ScriptBranches, SwapKey, SwapLock, SwapScript, SwapScriptKind, SwapScriptParams,
    SwapScriptRequest, TimeoutField, joint_public_key, parse_swap_script, script_version,
    taproot_leaf_kind,
};
use ln_chain_swap::network::SwapNetwork;
use proptest::prelude::*;

const KEY_ONE_PUBKEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
const KEY_THREE_PUBKEY: &str = "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";
/// hash160 of 32 zero bytes.
const ZERO_SECRET_HASH160: &str = "b8bcb07f6344b42ab04250c86a6e8b75d3fdbbc6";
/// hash160 of the key 3 public key.
const KEY_THREE_HASH160: &str = "7dd65592d0ab2fe0d0257d571abf032cd9db93dc";

fn secret(n: u8) -> Result<SecretKey> {
    let mut bytes = [0u8; 32];
    bytes[31] = n;
    SecretKey::from_slice(&bytes).context("secret key")
}

// The refund key is the key of secret 3: a run of 0x03 bytes is not a valid curve point.
fn fixture_params() -> Result<SwapScriptParams> {
    Ok(SwapScriptParams::new(
        SwapKey::from_private_key(secret(1)?),
        SwapKey::from_public_key(PublicKey::from_str(KEY_THREE_PUBKEY)?),
        SwapLock::Preimage([0u8; 32]),
        1_571_879,
    ))
}

#[test]
fn v1_script_matches_known_serialization() -> Result<()> {
    let secp = Secp256k1::new();
    let script = SwapScript::v1(&secp, &fixture_params()?)?;

    let expected = format!(
        "8201208763a914{ZERO_SECRET_HASH160}8821{KEY_ONE_PUBKEY}67750327fc17b17521{KEY_THREE_PUBKEY}68ac"
    );
    assert_eq!(script.script().to_hex_string(), expected);
    assert_eq!(script.kind(), SwapScriptKind::V1);
    assert_eq!(script_version(script.script()), Some(SwapScriptKind::V1));
    Ok(())
}

#[test]
fn v2_script_matches_known_serialization() -> Result<()> {
    let secp = Secp256k1::new();
    let script = SwapScript::v2(&secp, &fixture_params()?)?;

    let expected = format!(
        "21{KEY_ONE_PUBKEY}ac6476a914{KEY_THREE_HASH160}88ad0327fc17b167820120 88a914{ZERO_SECRET_HASH160}8851b268"
    )
    .replace(' ', "");
    assert_eq!(script.script().to_hex_string(), expected);
    assert_eq!(script_version(script.script()), Some(SwapScriptKind::V2));
    Ok(())
}

#[test]
fn versions_never_cross_match() -> Result<()> {
    let secp = Secp256k1::new();
    let params = fixture_params()?;
    let v1 = SwapScript::v1(&secp, &params)?;
    let v2 = SwapScript::v2(&secp, &params)?;

    assert!(is_script_matching_template(v1.script(), &v1_template()));
    assert!(!is_script_matching_template(v1.script(), &v2_template()));
    assert!(is_script_matching_template(v2.script(), &v2_template()));
    assert!(!is_script_matching_template(v2.script(), &v1_template()));

    let p2wsh = v1.p2wsh_output_script();
    assert_eq!(script_version(&p2wsh), None);
    Ok(())
}

#[test]
fn hash_and_secret_build_identical_scripts() -> Result<()> {
    let secp = Secp256k1::new();
    let preimage = [7u8; 32];
    let hash = sha256::Hash::hash(&preimage);

    let from_secret = SwapScriptParams {
        lock: SwapLock::Preimage(preimage),
        ..fixture_params()?
    };
    let from_hash = SwapScriptParams {
        lock: SwapLock::Hash(hash),
        ..fixture_params()?
    };

    let a = SwapScript::v2(&secp, &from_secret)?;
    let b = SwapScript::v2(&secp, &from_hash)?;
    assert_eq!(a.hash(), hash);
    assert_eq!(a.script(), b.script());
    Ok(())
}

#[test]
fn private_and_public_keys_build_identical_scripts() -> Result<()> {
    let secp = Secp256k1::new();
    let params = fixture_params()?;
    let public = SwapScriptParams {
        claim_key: SwapKey::Public(PublicKey::from_str(KEY_ONE_PUBKEY)?),
        ..params
    };
    assert_eq!(
        SwapScript::v1(&secp, &params)?.script(),
        SwapScript::v1(&secp, &public)?.script()
    );
    Ok(())
}

#[test]
fn parse_recovers_script_parameters() -> Result<()> {
    let secp = Secp256k1::new();
    let params = fixture_params()?;
    let refund = PublicKey::from_str(KEY_THREE_PUBKEY)?;

    let v1 = parse_swap_script(SwapScript::v1(&secp, &params)?.script())?;
    assert_eq!(v1.kind, SwapScriptKind::V1);
    assert_eq!(v1.claim_public_key, PublicKey::from_str(KEY_ONE_PUBKEY)?);
    assert_eq!(v1.refund_public_key, Some(refund));
    assert_eq!(v1.timeout, 1_571_879);
    assert_eq!(v1.hash_lock.to_string(), ZERO_SECRET_HASH160);

    let v2 = parse_swap_script(SwapScript::v2(&secp, &params)?.script())?;
    assert_eq!(v2.kind, SwapScriptKind::V2);
    assert_eq!(v2.refund_public_key, None);
    assert_eq!(
        v2.refund_public_key_hash,
        hash160::Hash::hash(&refund.serialize())
    );
    assert_eq!(v2.timeout, 1_571_879);
    Ok(())
}

#[test]
fn request_requires_exactly_one_of_each_input() -> Result<()> {
    let valid = SwapScriptRequest {
        claim_public_key: Some(KEY_ONE_PUBKEY.to_string()),
        refund_public_key: Some(KEY_THREE_PUBKEY.to_string()),
        secret: Some("00".repeat(32)),
        timeout: Some(TimeoutField::Height(1_571_879)),
        ..Default::default()
    };
    let params = SwapScriptParams::try_from(&valid)?;
    let expected = SwapScriptParams {
        claim_key: SwapKey::Public(PublicKey::from_str(KEY_ONE_PUBKEY)?),
        ..fixture_params()?
    };
    assert_eq!(params, expected);

    let cases = [
        SwapScriptRequest {
            claim_public_key: None,
            ..valid.clone()
        },
        SwapScriptRequest {
            claim_private_key: Some(format!("{}01", "00".repeat(31))),
            ..valid.clone()
        },
        SwapScriptRequest {
            refund_public_key: None,
            ..valid.clone()
        },
        SwapScriptRequest {
            secret: None,
            ..valid.clone()
        },
        SwapScriptRequest {
            hash: Some("11".repeat(32)),
            ..valid.clone()
        },
        SwapScriptRequest {
            timeout: None,
            ..valid.clone()
        },
    ];
    for case in &cases {
        assert!(
            matches!(
                SwapScriptParams::try_from(case),
                Err(SwapError::InvalidScriptParameters(_))
            ),
            "accepted {case:?}"
        );
    }
    Ok(())
}

#[test]
fn malformed_timeouts_fail_composition() -> Result<()> {
    let secp = Secp256k1::new();
    let request = SwapScriptRequest {
        claim_public_key: Some(KEY_ONE_PUBKEY.to_string()),
        refund_public_key: Some(KEY_THREE_PUBKEY.to_string()),
        hash: Some("11".repeat(32)),
        timeout: Some(TimeoutField::Text("soon".to_string())),
        ..Default::default()
    };
    assert!(matches!(
        SwapScriptParams::try_from(&request),
        Err(SwapError::ScriptCompositionError(_))
    ));

    let negative = SwapScriptRequest {
        timeout: Some(TimeoutField::Height(-5)),
        ..request.clone()
    };
    assert!(matches!(
        SwapScriptParams::try_from(&negative),
        Err(SwapError::ScriptCompositionError(_))
    ));

    let timestamp = SwapScriptParams {
        timeout: 1_700_000_000,
        ..fixture_params()?
    };
    assert!(matches!(
        SwapScript::v2(&secp, &timestamp),
        Err(SwapError::ScriptCompositionError(_))
    ));
    assert!(matches!(
        ScriptBranches::new(&secp, &timestamp),
        Err(SwapError::ScriptCompositionError(_))
    ));
    Ok(())
}

#[test]
fn taproot_branches_commit_to_both_leaves() -> Result<()> {
    let secp = Secp256k1::new();
    let params = SwapScriptParams {
        refund_key: SwapKey::Private(secret(3)?),
        ..fixture_params()?
    };
    let branches = ScriptBranches::new(&secp, &params)?;

    assert_eq!(branches.claim.kind(), SwapScriptKind::TaprootClaim);
    assert_eq!(branches.refund.kind(), SwapScriptKind::TaprootRefund);
    assert_eq!(
        taproot_leaf_kind(branches.claim.script()),
        Some(SwapScriptKind::TaprootClaim)
    );
    assert_eq!(
        taproot_leaf_kind(branches.refund.script()),
        Some(SwapScriptKind::TaprootRefund)
    );
    assert_eq!(script_version(branches.claim.script()), None);

    assert_eq!(
        branches.refund.script().to_hex_string(),
        format!("20{}ad0327fc17b1", &KEY_THREE_PUBKEY[2..])
    );

    let internal = joint_public_key(
        &params.claim_key.public_key(&secp),
        &params.refund_key.public_key(&secp),
    )?
    .x_only_public_key()
    .0;
    let spend_info = branches.spend_info(&secp, internal)?;
    assert_eq!(spend_info.merkle_root(), Some(branches.hash));

    let address = branches.address(&secp, internal, SwapNetwork::Regtest)?;
    assert!(address.to_string().starts_with("bcrt1p"));
    Ok(())
}

#[test]
fn small_timeouts_compile_to_recognizable_scripts() -> Result<()> {
    let secp = Secp256k1::new();
    for timeout in [1, 10, 16, 17] {
        let params = SwapScriptParams {
            timeout,
            ..fixture_params()?
        };

        let v1 = SwapScript::v1(&secp, &params)?;
        assert_eq!(script_version(v1.script()), Some(SwapScriptKind::V1), "v1 at {timeout}");
        assert_eq!(parse_swap_script(v1.script())?.timeout, timeout);

        let v2 = SwapScript::v2(&secp, &params)?;
        assert_eq!(script_version(v2.script()), Some(SwapScriptKind::V2), "v2 at {timeout}");
        assert_eq!(parse_swap_script(v2.script())?.timeout, timeout);

        let branches = ScriptBranches::new(&secp, &params)?;
        assert_eq!(
            taproot_leaf_kind(branches.refund.script()),
            Some(SwapScriptKind::TaprootRefund),
            "refund leaf at {timeout}"
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn built_scripts_report_their_version(
        claim in 1u8..=255,
        refund in 1u8..=255,
        preimage in any::<[u8; 32]>(),
        timeout in 1u32..500_000_000,
    ) {
        let secp = Secp256k1::new();
        let params = SwapScriptParams::new(
            SwapKey::Private(secret(claim).expect("claim key")),
            SwapKey::Private(secret(refund).expect("refund key")),
            SwapLock::Preimage(preimage),
            timeout,
        );
        let v1 = SwapScript::v1(&secp, &params).expect("v1");
        let v2 = SwapScript::v2(&secp, &params).expect("v2");

        prop_assert_eq!(script_version(v1.script()), Some(SwapScriptKind::V1));
        prop_assert_eq!(script_version(v2.script()), Some(SwapScriptKind::V2));
        prop_assert_eq!(v1.hash(), sha256::Hash::hash(&preimage));
        prop_assert_eq!(parse_swap_script(v1.script()).expect("parse v1").timeout, timeout);
        prop_assert_eq!(parse_swap_script(v2.script()).expect("parse v2").timeout, timeout);
    }
}
