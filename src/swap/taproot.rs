use bitcoin::absolute::LockTime;
use bitcoin::secp256k1::{All, Keypair, Secp256k1, SecretKey, schnorr};
use bitcoin::sighash::TapSighashType;
use bitcoin::taproot::ControlBlock;
use bitcoin::transaction::Version;
use bitcoin::{ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness, XOnlyPublicKey};

use super::sizing::{SweepTarget, size_sweep_outputs};
use super::witness::{
    SCHNORR_SIGNATURE_LEN, key_path_sighash, key_path_witness, placeholder_signature,
    sign_taproot_script, taproot_script_witness,
};
use super::SwapUtxo;
use crate::error::{Result, SwapError};
use crate::htlc::{PREIMAGE_LEN, ScriptBranches, SwapScriptKind, joint_secret_key};
use crate::network::SwapNetwork;

/// A Taproot swap output and where to sweep it.
#[derive(Debug, Clone)]
pub struct TaprootSpend<'a> {
    pub branches: &'a ScriptBranches,
    /// Untweaked key the script tree is committed under.
    pub internal_key: XOnlyPublicKey,
    pub utxo: SwapUtxo,
    pub sweep: SweepTarget,
    pub network: SwapNetwork,
}

impl TaprootSpend<'_> {
    fn prevout(&self, secp: &Secp256k1<All>) -> Result<TxOut> {
        Ok(TxOut {
            value: self.utxo.amount(),
            script_pubkey: self.branches.output_script(secp, self.internal_key)?,
        })
    }

    fn control_block(&self, secp: &Secp256k1<All>, kind: SwapScriptKind) -> Result<ControlBlock> {
        self.branches.control_block(secp, self.internal_key, kind)
    }

    fn unsigned(&self, lock_time: LockTime, sequence: Sequence, witness: Witness) -> Result<Transaction> {
        let sweep_script = self.network.sweep_script(&self.sweep.address)?;
        let mut tx = Transaction {
            version: Version::TWO,
            lock_time,
            input: vec![TxIn {
                previous_output: self.utxo.outpoint,
                script_sig: ScriptBuf::new(),
                sequence,
                witness,
            }],
            output: Vec::new(),
        };
        tx.output = size_sweep_outputs(
            &tx,
            self.utxo.tokens,
            sweep_script,
            &self.sweep,
            self.network,
        )?;
        tx.input[0].witness = Witness::new();
        Ok(tx)
    }
}

/// Claims through the hash-lock leaf: `[preimage, sig, leaf, control_block]`.
pub fn build_taproot_claim_tx(
    secp: &Secp256k1<All>,
    spend: &TaprootSpend<'_>,
    claim_key: &SecretKey,
    preimage: &[u8; PREIMAGE_LEN],
    current_block_height: Option<u32>,
) -> Result<Transaction> {
    let leaf = spend.branches.claim.script();
    let control_block = spend.control_block(secp, SwapScriptKind::TaprootClaim)?;
    let prevout = spend.prevout(secp)?;

    let lock_time = match current_block_height {
        Some(height) => LockTime::from_height(height).map_err(|e| {
            SwapError::ScriptCompositionError(format!("invalid claim height {height}: {e}"))
        })?,
        None => LockTime::ZERO,
    };

    let placeholder = taproot_script_witness(
        leaf,
        &placeholder_signature(SCHNORR_SIGNATURE_LEN),
        Some(preimage),
        &control_block,
    )?;
    let mut tx = spend.unsigned(lock_time, Sequence::from_height(1), placeholder)?;

    let keypair = Keypair::from_secret_key(secp, claim_key);
    let signature = sign_taproot_script(secp, &tx, 0, &[prevout], leaf, &keypair)?;
    tx.input[0].witness = taproot_script_witness(leaf, &signature, Some(preimage), &control_block)?;

    tracing::debug!(txid = %tx.compute_txid(), "built taproot claim transaction");
    Ok(tx)
}

/// Refunds through the timeout leaf: `[sig, leaf, control_block]`.
pub fn build_taproot_refund_tx(
    secp: &Secp256k1<All>,
    spend: &TaprootSpend<'_>,
    refund_key: &SecretKey,
) -> Result<Transaction> {
    let leaf = spend.branches.refund.script();
    let control_block = spend.control_block(secp, SwapScriptKind::TaprootRefund)?;
    let prevout = spend.prevout(secp)?;

    let placeholder = taproot_script_witness(
        leaf,
        &placeholder_signature(SCHNORR_SIGNATURE_LEN),
        None,
        &control_block,
    )?;
    let mut tx = spend.unsigned(
        spend.branches.refund.timeout(),
        Sequence::ENABLE_LOCKTIME_NO_RBF,
        placeholder,
    )?;

    let keypair = Keypair::from_secret_key(secp, refund_key);
    let signature = sign_taproot_script(secp, &tx, 0, &[prevout], leaf, &keypair)?;
    tx.input[0].witness = taproot_script_witness(leaf, &signature, None, &control_block)?;

    tracing::debug!(
        txid = %tx.compute_txid(),
        timeout = %spend.branches.refund.timeout(),
        "built taproot refund transaction"
    );
    Ok(tx)
}

/// A key-path sweep sized for a single Schnorr signature, ready to be signed
/// by both parties (e.g. through a MuSig2 session).
pub fn unsigned_taproot_cooperative_tx(spend: &TaprootSpend<'_>) -> Result<Transaction> {
    spend.unsigned(
        LockTime::ZERO,
        Sequence::ENABLE_RBF_NO_LOCKTIME,
        key_path_witness(&placeholder_signature(SCHNORR_SIGNATURE_LEN)),
    )
}

/// Checks a final key-path signature against the tweaked output key and attaches it.
pub fn attach_key_path_signature(
    secp: &Secp256k1<All>,
    spend: &TaprootSpend<'_>,
    mut tx: Transaction,
    signature: &schnorr::Signature,
) -> Result<Transaction> {
    let prevout = spend.prevout(secp)?;
    let msg = key_path_sighash(&tx, 0, &[prevout])?;
    let output_key = spend
        .branches
        .spend_info(secp, spend.internal_key)?
        .output_key()
        .to_x_only_public_key();

    secp.verify_schnorr(signature, &msg, &output_key)?;

    let signature = bitcoin::taproot::Signature {
        signature: *signature,
        sighash_type: TapSighashType::Default,
    };
    tx.input[0].witness = key_path_witness(&signature.to_vec());
    Ok(tx)
}

/// Cooperative key-path sweep signed locally with both participants' keys.
///
/// The internal key must be the point sum of the two public keys.
pub fn build_taproot_cooperative_tx(
    secp: &Secp256k1<All>,
    spend: &TaprootSpend<'_>,
    claim_key: &SecretKey,
    refund_key: &SecretKey,
) -> Result<Transaction> {
    let joint = Keypair::from_secret_key(secp, &joint_secret_key(claim_key, refund_key)?);
    if joint.x_only_public_key().0 != spend.internal_key {
        return Err(SwapError::InvalidScriptParameters(
            "internal key is not the sum of the claim and refund keys".to_string(),
        ));
    }

    let tweak = spend
        .branches
        .spend_info(secp, spend.internal_key)?
        .tap_tweak()
        .to_scalar();
    let tweaked = joint.add_xonly_tweak(secp, &tweak)?;

    let tx = unsigned_taproot_cooperative_tx(spend)?;
    let msg = key_path_sighash(&tx, 0, &[spend.prevout(secp)?])?;
    let signature = secp.sign_schnorr_no_aux_rand(&msg, &tweaked);

    tracing::debug!(txid = %tx.compute_txid(), "signed cooperative key path sweep");
    attach_key_path_signature(secp, spend, tx, &signature)
}
