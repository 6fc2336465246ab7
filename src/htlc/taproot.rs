use bitcoin::secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Signing, Verification};
use bitcoin::taproot::{
    ControlBlock, LeafVersion, TapLeafHash, TapNodeHash, TaprootBuilder, TaprootSpendInfo,
};
use bitcoin::{Address, ScriptBuf, XOnlyPublicKey};

use super::script::{SwapScript, encode_cltv};
use super::{SwapScriptKind, SwapScriptParams};
use crate::error::{Result, SwapError};
use crate::network::SwapNetwork;

/// The two leaves of a Taproot swap output and their branch hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBranches {
    pub claim: SwapScript,
    pub refund: SwapScript,
    /// TapBranch of the two leaf hashes, i.e. the tree's Merkle root.
    pub hash: TapNodeHash,
}

impl ScriptBranches {
    pub fn new<C: Signing>(secp: &Secp256k1<C>, params: &SwapScriptParams) -> Result<Self> {
        let hash = params.lock.hash();
        let timeout = encode_cltv(params.timeout)?;
        let (claim_key, _) = params.claim_key.public_key(secp).x_only_public_key();
        let (refund_key, _) = params.refund_key.public_key(secp).x_only_public_key();

        let claim = SwapScript::taproot_claim_leaf(claim_key, hash, timeout);
        let refund = SwapScript::taproot_refund_leaf(refund_key, hash, timeout);

        let hash = TapNodeHash::from_node_hashes(
            TapNodeHash::from(leaf_hash(claim.script())),
            TapNodeHash::from(leaf_hash(refund.script())),
        );

        Ok(Self { claim, refund, hash })
    }

    pub fn leaf(&self, kind: SwapScriptKind) -> Result<&SwapScript> {
        match kind {
            SwapScriptKind::TaprootClaim => Ok(&self.claim),
            SwapScriptKind::TaprootRefund => Ok(&self.refund),
            SwapScriptKind::V1 | SwapScriptKind::V2 => Err(SwapError::UnknownSwapScriptType),
        }
    }

    pub fn spend_info<C: Verification>(
        &self,
        secp: &Secp256k1<C>,
        internal_key: XOnlyPublicKey,
    ) -> Result<TaprootSpendInfo> {
        let spend_info = TaprootBuilder::new()
            .add_leaf(1, self.claim.script().to_owned())?
            .add_leaf(1, self.refund.script().to_owned())?
            .finalize(secp, internal_key)
            .map_err(|_| SwapError::Taproot("script tree is incomplete".to_string()))?;

        if spend_info.merkle_root() != Some(self.hash) {
            return Err(SwapError::Taproot(
                "script tree root does not match branch hash".to_string(),
            ));
        }

        Ok(spend_info)
    }

    pub fn output_script<C: Verification>(
        &self,
        secp: &Secp256k1<C>,
        internal_key: XOnlyPublicKey,
    ) -> Result<ScriptBuf> {
        let spend_info = self.spend_info(secp, internal_key)?;
        Ok(ScriptBuf::new_p2tr_tweaked(spend_info.output_key()))
    }

    pub fn address<C: Verification>(
        &self,
        secp: &Secp256k1<C>,
        internal_key: XOnlyPublicKey,
        network: SwapNetwork,
    ) -> Result<Address> {
        let spend_info = self.spend_info(secp, internal_key)?;
        Ok(Address::p2tr_tweaked(
            spend_info.output_key(),
            network.bitcoin_network(),
        ))
    }

    /// Proof that the `kind` leaf is committed to under `internal_key`.
    pub fn control_block<C: Verification>(
        &self,
        secp: &Secp256k1<C>,
        internal_key: XOnlyPublicKey,
        kind: SwapScriptKind,
    ) -> Result<ControlBlock> {
        let leaf = self.leaf(kind)?;
        self.spend_info(secp, internal_key)?
            .control_block(&(leaf.script().to_owned(), LeafVersion::TapScript))
            .ok_or_else(|| SwapError::Taproot(format!("no control block for {kind:?} leaf")))
    }
}

pub fn leaf_hash(script: &bitcoin::Script) -> TapLeafHash {
    TapLeafHash::from_script(script, LeafVersion::TapScript)
}

/// Point sum of two participant keys, used as the Taproot internal key.
pub fn joint_public_key(a: &PublicKey, b: &PublicKey) -> Result<PublicKey> {
    a.combine(b)
        .map_err(|e| SwapError::InvalidScriptParameters(format!("cannot combine keys: {e}")))
}

/// Scalar sum of two private keys; the secret behind [`joint_public_key`].
pub fn joint_secret_key(a: &SecretKey, b: &SecretKey) -> Result<SecretKey> {
    a.add_tweak(&Scalar::from(*b))
        .map_err(|e| SwapError::InvalidScriptParameters(format!("cannot combine keys: {e}")))
}
