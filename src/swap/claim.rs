use bitcoin::absolute::LockTime;
use bitcoin::script::Script;
use bitcoin::secp256k1::{Secp256k1, SecretKey, Signing};
use bitcoin::transaction::Version;
use bitcoin::{ScriptBuf, Sequence, Transaction, TxIn, Witness};

use super::sizing::{SweepTarget, size_sweep_outputs};
use super::witness::{ECDSA_SIGNATURE_ALLOWANCE, legacy_witness, placeholder_signature, sign_segwit_v0};
use super::SwapUtxo;
use crate::error::{Result, SwapError};
use crate::htlc::{PREIMAGE_LEN, SwapScriptKind, script_version};
use crate::network::SwapNetwork;

/// Inputs for sweeping a P2WSH swap output through its hash lock.
#[derive(Debug, Clone)]
pub struct ClaimParams<'a> {
    pub witness_script: &'a Script,
    pub utxo: SwapUtxo,
    pub preimage: [u8; PREIMAGE_LEN],
    pub claim_key: SecretKey,
    pub sweep: SweepTarget,
    /// Current tip; used as the locktime to discourage fee sniping.
    pub current_block_height: Option<u32>,
    pub network: SwapNetwork,
}

pub fn build_claim_tx<C: Signing>(secp: &Secp256k1<C>, params: &ClaimParams<'_>) -> Result<Transaction> {
    let kind = script_version(params.witness_script).ok_or(SwapError::UnknownSwapScriptType)?;
    let sweep_script = params.network.sweep_script(&params.sweep.address)?;
    let claim_pubkey = params.claim_key.public_key(secp);

    let sequence = claim_sequence(kind);
    let lock_time = match params.current_block_height {
        Some(height) => LockTime::from_height(height).map_err(|e| {
            SwapError::ScriptCompositionError(format!("invalid claim height {height}: {e}"))
        })?,
        None => LockTime::ZERO,
    };

    let mut tx = Transaction {
        version: Version::TWO,
        lock_time,
        input: vec![TxIn {
            previous_output: params.utxo.outpoint,
            script_sig: ScriptBuf::new(),
            sequence,
            witness: legacy_witness(
                params.witness_script,
                &placeholder_signature(ECDSA_SIGNATURE_ALLOWANCE),
                &params.preimage,
                &claim_pubkey,
            )?,
        }],
        output: Vec::new(),
    };

    tx.output = size_sweep_outputs(
        &tx,
        params.utxo.tokens,
        sweep_script,
        &params.sweep,
        params.network,
    )?;
    tx.input[0].witness = Witness::new();

    let signature = sign_segwit_v0(
        secp,
        &tx,
        0,
        params.witness_script,
        params.utxo.amount(),
        &params.claim_key,
    )?;
    tx.input[0].witness = legacy_witness(
        params.witness_script,
        &signature,
        &params.preimage,
        &claim_pubkey,
    )?;

    tracing::debug!(
        txid = %tx.compute_txid(),
        kind = ?kind,
        outputs = tx.output.len(),
        "built claim transaction"
    );

    Ok(tx)
}

/// v1 has no relative lock; v2 claims wait one block (`1 OP_CSV`).
fn claim_sequence(kind: SwapScriptKind) -> Sequence {
    if kind.has_csv_claim() {
        Sequence::from_height(1)
    } else {
        Sequence::ZERO
    }
}
