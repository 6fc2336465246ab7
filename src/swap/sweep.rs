use bitcoin::{Script, Transaction, Witness};
use serde::{Deserialize, Serialize};

use crate::htlc::{PREIMAGE_LEN, SwapScriptKind, script_version, taproot_leaf_kind};

const PUBKEY_LEN: usize = 33;
const TAPROOT_ANNEX_TAG: u8 = 0x50;
const TAPROOT_LEAF_MASK: u8 = 0xfe;
const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;

/// Direction of a spend of a swap output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Spent through the hash lock, revealing the preimage.
    Success,
    /// Spent through the timeout path.
    Timeout,
}

/// Classifies the first input of `tx` that spends a recognizable swap script.
pub fn classify_sweep(tx: &Transaction) -> Option<SweepKind> {
    tx.input.iter().find_map(|input| classify_witness(&input.witness))
}

pub fn classify_witness(witness: &Witness) -> Option<SweepKind> {
    let items: Vec<&[u8]> = witness.iter().collect();
    let (last, rest) = items.split_last()?;

    match script_version(Script::from_bytes(last)) {
        Some(SwapScriptKind::V1) => match rest {
            [_signature, unlock] if unlock.len() == PREIMAGE_LEN => Some(SweepKind::Success),
            [_signature, _dummy] => Some(SweepKind::Timeout),
            _ => None,
        },
        Some(SwapScriptKind::V2) => match rest {
            [preimage, _signature] if preimage.len() == PREIMAGE_LEN => Some(SweepKind::Success),
            [_signature, pubkey, _dummy] if pubkey.len() == PUBKEY_LEN => Some(SweepKind::Timeout),
            _ => None,
        },
        _ => classify_tapscript_witness(&items),
    }
}

fn classify_tapscript_witness(items: &[&[u8]]) -> Option<SweepKind> {
    let items = match items.split_last() {
        Some((annex, rest)) if rest.len() >= 2 && annex.first() == Some(&TAPROOT_ANNEX_TAG) => rest,
        _ => items,
    };
    let [stack @ .., leaf, control_block] = items else {
        return None;
    };
    if control_block.first().map(|b| b & TAPROOT_LEAF_MASK) != Some(TAPSCRIPT_LEAF_VERSION) {
        return None;
    }

    match (taproot_leaf_kind(Script::from_bytes(leaf)), stack) {
        (Some(SwapScriptKind::TaprootClaim), [preimage, _signature])
            if preimage.len() == PREIMAGE_LEN =>
        {
            Some(SweepKind::Success)
        }
        (Some(SwapScriptKind::TaprootRefund), [_signature]) => Some(SweepKind::Timeout),
        _ => None,
    }
}
