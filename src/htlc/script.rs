use bitcoin::absolute::LockTime;
use bitcoin::hashes::{Hash as _, hash160, ripemd160, sha256};
use bitcoin::opcodes::all::*;
use bitcoin::script::{Builder, Script, ScriptBuf};
use bitcoin::secp256k1::{PublicKey, Secp256k1, Signing};
use bitcoin::{Address, XOnlyPublicKey};
use serde::Serialize;

use super::template::{ScriptElement, decompile, script_version, small_int};
use super::{PREIMAGE_LEN, SwapScriptKind, SwapScriptParams};
use crate::error::{Result, SwapError};
use crate::network::SwapNetwork;

/// A compiled swap script together with the hash it locks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapScript {
    kind: SwapScriptKind,
    script: ScriptBuf,
    hash: sha256::Hash,
    timeout: LockTime,
}

impl SwapScript {
    /// `OP_SIZE 32 OP_EQUAL OP_IF OP_HASH160 <h> OP_EQUALVERIFY <claim> OP_ELSE
    /// OP_DROP <cltv> OP_CLTV OP_DROP <refund> OP_ENDIF OP_CHECKSIG`
    pub fn v1<C: Signing>(secp: &Secp256k1<C>, params: &SwapScriptParams) -> Result<Self> {
        let hash = params.lock.hash();
        let timeout = encode_cltv(params.timeout)?;
        let claim = bitcoin::PublicKey::new(params.claim_key.public_key(secp));
        let refund = bitcoin::PublicKey::new(params.refund_key.public_key(secp));

        let script = Builder::new()
            .push_opcode(OP_SIZE)
            .push_int(PREIMAGE_LEN as i64)
            .push_opcode(OP_EQUAL)
            .push_opcode(OP_IF)
            .push_opcode(OP_HASH160)
            .push_slice(hash_lock(&hash).to_byte_array())
            .push_opcode(OP_EQUALVERIFY)
            .push_key(&claim)
            .push_opcode(OP_ELSE)
            .push_opcode(OP_DROP)
            .push_lock_time(timeout)
            .push_opcode(OP_CLTV)
            .push_opcode(OP_DROP)
            .push_key(&refund)
            .push_opcode(OP_ENDIF)
            .push_opcode(OP_CHECKSIG)
            .into_script();

        Ok(Self {
            kind: SwapScriptKind::V1,
            script,
            hash,
            timeout,
        })
    }

    /// `<claim> OP_CHECKSIG OP_NOTIF OP_DUP OP_HASH160 <hash160(refund)>
    /// OP_EQUALVERIFY OP_CHECKSIGVERIFY <cltv> OP_CLTV OP_ELSE OP_SIZE 32
    /// OP_EQUALVERIFY OP_HASH160 <h> OP_EQUALVERIFY 1 OP_CSV OP_ENDIF`
    pub fn v2<C: Signing>(secp: &Secp256k1<C>, params: &SwapScriptParams) -> Result<Self> {
        let hash = params.lock.hash();
        let timeout = encode_cltv(params.timeout)?;
        let claim = bitcoin::PublicKey::new(params.claim_key.public_key(secp));
        let refund = params.refund_key.public_key(secp);

        let script = Builder::new()
            .push_key(&claim)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_NOTIF)
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(hash160::Hash::hash(&refund.serialize()).to_byte_array())
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIGVERIFY)
            .push_lock_time(timeout)
            .push_opcode(OP_CLTV)
            .push_opcode(OP_ELSE)
            .push_opcode(OP_SIZE)
            .push_int(PREIMAGE_LEN as i64)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_HASH160)
            .push_slice(hash_lock(&hash).to_byte_array())
            .push_opcode(OP_EQUALVERIFY)
            .push_int(1)
            .push_opcode(OP_CSV)
            .push_opcode(OP_ENDIF)
            .into_script();

        Ok(Self {
            kind: SwapScriptKind::V2,
            script,
            hash,
            timeout,
        })
    }

    /// Claim leaf: `<claim> OP_CHECKSIGVERIFY OP_SIZE 32 OP_EQUALVERIFY
    /// OP_HASH160 <h> OP_EQUALVERIFY 1 OP_CSV`
    pub(crate) fn taproot_claim_leaf(
        claim: XOnlyPublicKey,
        hash: sha256::Hash,
        timeout: LockTime,
    ) -> Self {
        let script = Builder::new()
            .push_x_only_key(&claim)
            .push_opcode(OP_CHECKSIGVERIFY)
            .push_opcode(OP_SIZE)
            .push_int(PREIMAGE_LEN as i64)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_HASH160)
            .push_slice(hash_lock(&hash).to_byte_array())
            .push_opcode(OP_EQUALVERIFY)
            .push_int(1)
            .push_opcode(OP_CSV)
            .into_script();

        Self {
            kind: SwapScriptKind::TaprootClaim,
            script,
            hash,
            timeout,
        }
    }

    /// Refund leaf: `<refund> OP_CHECKSIGVERIFY <cltv> OP_CLTV`
    pub(crate) fn taproot_refund_leaf(
        refund: XOnlyPublicKey,
        hash: sha256::Hash,
        timeout: LockTime,
    ) -> Self {
        let script = Builder::new()
            .push_x_only_key(&refund)
            .push_opcode(OP_CHECKSIGVERIFY)
            .push_lock_time(timeout)
            .push_opcode(OP_CLTV)
            .into_script();

        Self {
            kind: SwapScriptKind::TaprootRefund,
            script,
            hash,
            timeout,
        }
    }

    pub fn kind(&self) -> SwapScriptKind {
        self.kind
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn hash(&self) -> sha256::Hash {
        self.hash
    }

    pub fn timeout(&self) -> LockTime {
        self.timeout
    }

    pub fn p2wsh_address(&self, network: SwapNetwork) -> Address {
        Address::p2wsh(&self.script, network.bitcoin_network())
    }

    pub fn nested_address(&self, network: SwapNetwork) -> Address {
        Address::p2shwsh(&self.script, network.bitcoin_network())
    }

    pub fn p2wsh_output_script(&self) -> ScriptBuf {
        ScriptBuf::new_p2wsh(&self.script.wscript_hash())
    }
}

/// The 20-byte commitment the scripts check the preimage against.
pub fn hash_lock(hash: &sha256::Hash) -> ripemd160::Hash {
    ripemd160::Hash::hash(hash.as_byte_array())
}

/// BIP65 block-height timeout. Zero and timestamp values are rejected.
pub fn encode_cltv(timeout: u32) -> Result<LockTime> {
    if timeout == 0 {
        return Err(SwapError::ScriptCompositionError(
            "timeout height must be positive".to_string(),
        ));
    }
    LockTime::from_height(timeout).map_err(|e| {
        SwapError::ScriptCompositionError(format!("invalid timeout height {timeout}: {e}"))
    })
}

/// Parameters recovered from an observed legacy swap script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapScriptDetails {
    pub kind: SwapScriptKind,
    pub claim_public_key: PublicKey,
    /// Present for v1 scripts, which commit to the full refund key.
    pub refund_public_key: Option<PublicKey>,
    /// hash160 of the refund key; v2 scripts only commit to this.
    pub refund_public_key_hash: hash160::Hash,
    pub hash_lock: ripemd160::Hash,
    pub timeout: u32,
}

pub fn parse_swap_script(script: &Script) -> Result<SwapScriptDetails> {
    let kind = script_version(script).ok_or(SwapError::UnknownSwapScriptType)?;
    let elements = decompile(script).ok_or(SwapError::UnknownSwapScriptType)?;

    // Slot positions follow the v1/v2 templates.
    let (claim_at, refund_at, hash_at, cltv_at) = match kind {
        SwapScriptKind::V1 => (7, 13, 5, 10),
        SwapScriptKind::V2 => (0, 5, 15, 8),
        SwapScriptKind::TaprootClaim | SwapScriptKind::TaprootRefund => {
            return Err(SwapError::UnknownSwapScriptType);
        }
    };

    let claim_public_key = PublicKey::from_slice(push_at(&elements, claim_at)?).map_err(|e| {
        SwapError::ScriptCompositionError(format!("invalid claim public key in script: {e}"))
    })?;

    let (refund_public_key, refund_public_key_hash) = match kind {
        SwapScriptKind::V1 => {
            let refund = PublicKey::from_slice(push_at(&elements, refund_at)?).map_err(|e| {
                SwapError::ScriptCompositionError(format!("invalid refund public key in script: {e}"))
            })?;
            (Some(refund), hash160::Hash::hash(&refund.serialize()))
        }
        _ => (None, hash160_at(&elements, refund_at)?),
    };

    let hash_lock = ripemd160::Hash::from_slice(push_at(&elements, hash_at)?)
        .map_err(|e| SwapError::ScriptCompositionError(format!("invalid hash lock: {e}")))?;

    let timeout = script_num_at(&elements, cltv_at)?;
    let timeout = u32::try_from(timeout)
        .map_err(|_| SwapError::ScriptCompositionError(format!("timeout out of range: {timeout}")))?;

    Ok(SwapScriptDetails {
        kind,
        claim_public_key,
        refund_public_key,
        refund_public_key_hash,
        hash_lock,
        timeout,
    })
}

fn push_at(elements: &[ScriptElement], index: usize) -> Result<&[u8]> {
    match elements.get(index) {
        Some(ScriptElement::Push(data)) => Ok(data),
        other => Err(SwapError::ScriptCompositionError(format!(
            "expected push at {index}, got {other:?}"
        ))),
    }
}

fn script_num_at(elements: &[ScriptElement], index: usize) -> Result<i64> {
    match elements.get(index) {
        Some(ScriptElement::Opcode(op)) => small_int(*op).map(i64::from).ok_or_else(|| {
            SwapError::ScriptCompositionError(format!("expected script number at {index}"))
        }),
        _ => decode_script_num(push_at(elements, index)?),
    }
}

fn hash160_at(elements: &[ScriptElement], index: usize) -> Result<hash160::Hash> {
    hash160::Hash::from_slice(push_at(elements, index)?)
        .map_err(|e| SwapError::ScriptCompositionError(format!("invalid key hash: {e}")))
}

fn decode_script_num(bytes: &[u8]) -> Result<i64> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 5 {
        return Err(SwapError::ScriptCompositionError(format!(
            "script number too large: {} bytes",
            bytes.len()
        )));
    }

    let mut magnitude = bytes.to_vec();
    let negative = magnitude.last().is_some_and(|b| (b & 0x80) != 0);
    if let Some(last) = magnitude.last_mut() {
        *last &= 0x7f;
    }

    let mut value: i64 = 0;
    for (i, b) in magnitude.iter().enumerate() {
        value |= (*b as i64) << (8 * i);
    }

    Ok(if negative { -value } else { value })
}
