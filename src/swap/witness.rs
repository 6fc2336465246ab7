//! Witness stacks and signatures for every swap spend path.
//!
//! | script  | path          | stack (bottom to top)                            |
//! |---------|---------------|--------------------------------------------------|
//! | v1      | either        | `sig, unlock, script`                            |
//! | v2      | claim         | `preimage, sig, script`                          |
//! | v2      | refund        | `sig, pubkey, <empty>, script`                   |
//! | taproot | key path      | `sig`                                            |
//! | taproot | claim leaf    | `preimage, sig, leaf, control_block`             |
//! | taproot | refund leaf   | `sig, leaf, control_block`                       |

use bitcoin::hashes::Hash as _;
use bitcoin::secp256k1::{Keypair, Message, PublicKey, Secp256k1, SecretKey, Signing};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::ControlBlock;
use bitcoin::{Amount, EcdsaSighashType, Script, Transaction, TxOut, Witness};

use crate::error::{Result, SwapError};
use crate::htlc::taproot::leaf_hash;
use crate::htlc::{PREIMAGE_LEN, SwapScriptKind, script_version, taproot_leaf_kind};

/// Upper bound of a DER ECDSA signature with its sighash byte, as counted for fees.
pub const ECDSA_SIGNATURE_ALLOWANCE: usize = 72;
/// A BIP340 signature with `SIGHASH_DEFAULT`.
pub const SCHNORR_SIGNATURE_LEN: usize = 64;
/// Unlock element for a v1 refund; anything that is not 32 bytes takes the timeout branch.
pub const REFUND_DUMMY: [u8; 1] = [0];

/// Witness for a P2WSH swap script. The script generation is read from the
/// script itself and a v2 spend is treated as a claim iff `unlock` is a
/// 32-byte preimage.
pub fn legacy_witness(
    witness_script: &Script,
    signature: &[u8],
    unlock: &[u8],
    pubkey: &PublicKey,
) -> Result<Witness> {
    let script = witness_script.as_bytes();
    match script_version(witness_script) {
        Some(SwapScriptKind::V1) => Ok(Witness::from_slice(&[signature, unlock, script])),
        Some(SwapScriptKind::V2) if unlock.len() == PREIMAGE_LEN => {
            Ok(Witness::from_slice(&[unlock, signature, script]))
        }
        Some(SwapScriptKind::V2) => {
            let pubkey = pubkey.serialize();
            let dummy: &[u8] = &[];
            Ok(Witness::from_slice(&[signature, &pubkey[..], dummy, script]))
        }
        _ => Err(SwapError::UnknownSwapScriptType),
    }
}

/// Witness for a Taproot script-path spend of one of the swap leaves.
pub fn taproot_script_witness(
    leaf: &Script,
    signature: &[u8],
    preimage: Option<&[u8; PREIMAGE_LEN]>,
    control_block: &ControlBlock,
) -> Result<Witness> {
    let control_block = control_block.serialize();
    let control_block = control_block.as_slice();
    match (taproot_leaf_kind(leaf), preimage) {
        (Some(SwapScriptKind::TaprootClaim), Some(preimage)) => Ok(Witness::from_slice(&[
            &preimage[..],
            signature,
            leaf.as_bytes(),
            control_block,
        ])),
        (Some(SwapScriptKind::TaprootClaim), None) => Err(SwapError::InvalidScriptParameters(
            "claim leaf spend requires a preimage".to_string(),
        )),
        (Some(SwapScriptKind::TaprootRefund), _) => Ok(Witness::from_slice(&[
            signature,
            leaf.as_bytes(),
            control_block,
        ])),
        _ => Err(SwapError::UnknownSwapScriptType),
    }
}

pub fn key_path_witness(signature: &[u8]) -> Witness {
    Witness::from_slice(&[signature])
}

/// SegWit v0 `SIGHASH_ALL` signature over `input_index`, DER encoded with the sighash byte.
pub fn sign_segwit_v0<C: Signing>(
    secp: &Secp256k1<C>,
    tx: &Transaction,
    input_index: usize,
    witness_script: &Script,
    value: Amount,
    secret_key: &SecretKey,
) -> Result<Vec<u8>> {
    let sighash = SighashCache::new(tx).p2wsh_signature_hash(
        input_index,
        witness_script,
        value,
        EcdsaSighashType::All,
    )?;

    let msg = Message::from_digest(sighash.to_byte_array());
    let signature = secp.sign_ecdsa(&msg, secret_key);
    Ok(bitcoin::ecdsa::Signature::sighash_all(signature).to_vec())
}

/// SegWit v1 `SIGHASH_DEFAULT` signature committing to the spent `leaf`.
pub fn sign_taproot_script<C: Signing>(
    secp: &Secp256k1<C>,
    tx: &Transaction,
    input_index: usize,
    prevouts: &[TxOut],
    leaf: &Script,
    keypair: &Keypair,
) -> Result<Vec<u8>> {
    let sighash = SighashCache::new(tx).taproot_script_spend_signature_hash(
        input_index,
        &Prevouts::All(prevouts),
        leaf_hash(leaf),
        TapSighashType::Default,
    )?;

    let msg = Message::from_digest(sighash.to_byte_array());
    let signature = secp.sign_schnorr_no_aux_rand(&msg, keypair);
    Ok(bitcoin::taproot::Signature {
        signature,
        sighash_type: TapSighashType::Default,
    }
    .to_vec())
}

/// Key-path sighash a cooperative signer (local or MuSig2) has to sign.
pub fn key_path_sighash(tx: &Transaction, input_index: usize, prevouts: &[TxOut]) -> Result<Message> {
    let sighash = SighashCache::new(tx).taproot_key_spend_signature_hash(
        input_index,
        &Prevouts::All(prevouts),
        TapSighashType::Default,
    )?;
    Ok(Message::from_digest(sighash.to_byte_array()))
}

/// Worst-case sized stand-in for a signature, used while estimating weight.
pub fn placeholder_signature(len: usize) -> Vec<u8> {
    vec![0u8; len]
}
