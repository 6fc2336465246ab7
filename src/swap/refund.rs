use bitcoin::absolute::LockTime;
use bitcoin::script::{Builder, PushBytesBuf, Script};
use bitcoin::secp256k1::{Secp256k1, Signing};
use bitcoin::transaction::Version;
use bitcoin::{ScriptBuf, Sequence, Transaction, TxIn, Witness};

use super::sizing::{SweepTarget, size_sweep_outputs};
use super::witness::{
    ECDSA_SIGNATURE_ALLOWANCE, REFUND_DUMMY, legacy_witness, placeholder_signature, sign_segwit_v0,
};
use super::SwapUtxo;
use crate::error::{Result, SwapError};
use crate::htlc::{SwapKey, parse_swap_script};
use crate::network::SwapNetwork;

/// Inputs for sweeping a P2WSH swap output back after its timeout.
#[derive(Debug, Clone)]
pub struct RefundParams<'a> {
    pub witness_script: &'a Script,
    pub utxo: SwapUtxo,
    /// With a private key the refund is signed, otherwise it is returned unsigned.
    pub refund_key: SwapKey,
    pub sweep: SweepTarget,
    /// Spend a P2SH-wrapped P2WSH output.
    pub is_nested: bool,
    pub network: SwapNetwork,
}

pub fn build_refund_tx<C: Signing>(secp: &Secp256k1<C>, params: &RefundParams<'_>) -> Result<Transaction> {
    let details = parse_swap_script(params.witness_script)?;
    let sweep_script = params.network.sweep_script(&params.sweep.address)?;
    let refund_pubkey = params.refund_key.public_key(secp);

    let lock_time = LockTime::from_height(details.timeout).map_err(|e| {
        SwapError::ScriptCompositionError(format!("invalid timeout {}: {e}", details.timeout))
    })?;

    let script_sig = if params.is_nested {
        nested_script_sig(params.witness_script)?
    } else {
        ScriptBuf::new()
    };

    let mut tx = Transaction {
        version: Version::TWO,
        lock_time,
        input: vec![TxIn {
            previous_output: params.utxo.outpoint,
            script_sig,
            sequence: Sequence::ENABLE_LOCKTIME_NO_RBF,
            witness: legacy_witness(
                params.witness_script,
                &placeholder_signature(ECDSA_SIGNATURE_ALLOWANCE),
                &REFUND_DUMMY,
                &refund_pubkey,
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

    let Some(refund_key) = params.refund_key.secret_key() else {
        tracing::debug!(txid = %tx.compute_txid(), "built unsigned refund transaction");
        return Ok(tx);
    };

    let signature = sign_segwit_v0(
        secp,
        &tx,
        0,
        params.witness_script,
        params.utxo.amount(),
        refund_key,
    )?;
    tx.input[0].witness = legacy_witness(
        params.witness_script,
        &signature,
        &REFUND_DUMMY,
        &refund_pubkey,
    )?;

    tracing::debug!(
        txid = %tx.compute_txid(),
        kind = ?details.kind,
        timeout = details.timeout,
        "built refund transaction"
    );

    Ok(tx)
}

/// scriptSig of a P2SH-P2WSH spend: a single push of the witness program.
pub fn nested_script_sig(witness_script: &Script) -> Result<ScriptBuf> {
    let program = ScriptBuf::new_p2wsh(&witness_script.wscript_hash());
    let push = PushBytesBuf::try_from(program.into_bytes())
        .map_err(|e| SwapError::ScriptCompositionError(format!("redeem script push: {e}")))?;
    Ok(Builder::new().push_slice(push).into_script())
}
