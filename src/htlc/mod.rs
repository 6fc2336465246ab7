pub mod script;
pub mod taproot;
pub mod template;

use bitcoin::hashes::{Hash as _, sha256};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SwapError};

pub use script::{SwapScript, SwapScriptDetails, parse_swap_script};
pub use taproot::{ScriptBranches, joint_public_key, joint_secret_key};
pub use template::{script_version, taproot_leaf_kind};

pub const PREIMAGE_LEN: usize = 32;

/// Script generation of a swap output or Taproot leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapScriptKind {
    V1,
    V2,
    TaprootClaim,
    TaprootRefund,
}

impl SwapScriptKind {
    pub fn is_taproot(self) -> bool {
        matches!(self, SwapScriptKind::TaprootClaim | SwapScriptKind::TaprootRefund)
    }

    /// Whether the success path of this script carries `OP_CHECKSEQUENCEVERIFY`.
    pub fn has_csv_claim(self) -> bool {
        matches!(self, SwapScriptKind::V2 | SwapScriptKind::TaprootClaim)
    }
}

/// A swap participant key, known either in full or by its public half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKey {
    Private(SecretKey),
    Public(PublicKey),
}

impl SwapKey {
    pub fn from_private_key(key: SecretKey) -> Self {
        SwapKey::Private(key)
    }

    pub fn from_public_key(key: PublicKey) -> Self {
        SwapKey::Public(key)
    }

    pub fn public_key<C: Signing>(&self, secp: &Secp256k1<C>) -> PublicKey {
        match self {
            SwapKey::Private(sk) => sk.public_key(secp),
            SwapKey::Public(pk) => *pk,
        }
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        match self {
            SwapKey::Private(sk) => Some(sk),
            SwapKey::Public(_) => None,
        }
    }
}

/// The hash lock, given either as the swap hash or as its preimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapLock {
    Hash(sha256::Hash),
    Preimage([u8; PREIMAGE_LEN]),
}

impl SwapLock {
    pub fn hash(&self) -> sha256::Hash {
        match self {
            SwapLock::Hash(hash) => *hash,
            SwapLock::Preimage(preimage) => sha256::Hash::hash(preimage),
        }
    }

    pub fn preimage(&self) -> Option<[u8; PREIMAGE_LEN]> {
        match self {
            SwapLock::Hash(_) => None,
            SwapLock::Preimage(preimage) => Some(*preimage),
        }
    }
}

/// Everything needed to compile a swap script of any generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapScriptParams {
    pub claim_key: SwapKey,
    pub refund_key: SwapKey,
    pub lock: SwapLock,
    /// CLTV block height after which the refund path opens.
    pub timeout: u32,
}

impl SwapScriptParams {
    pub fn new(claim_key: SwapKey, refund_key: SwapKey, lock: SwapLock, timeout: u32) -> Self {
        Self {
            claim_key,
            refund_key,
            lock,
            timeout,
        }
    }
}

/// CLTV timeout as it arrives from JSON or the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutField {
    Height(i64),
    Text(String),
}

impl TimeoutField {
    fn to_height(&self) -> Result<u32> {
        let height = match self {
            TimeoutField::Height(h) => *h,
            TimeoutField::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                SwapError::ScriptCompositionError(format!("non-numeric timeout: {s:?}"))
            })?,
        };
        u32::try_from(height)
            .map_err(|_| SwapError::ScriptCompositionError(format!("timeout out of range: {height}")))
    }
}

/// Loosely typed swap script parameters, hex encoded.
///
/// Converting into [`SwapScriptParams`] enforces that exactly one form of each
/// key and exactly one of `hash`/`secret` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapScriptRequest {
    pub claim_private_key: Option<String>,
    pub claim_public_key: Option<String>,
    pub refund_private_key: Option<String>,
    pub refund_public_key: Option<String>,
    pub hash: Option<String>,
    pub secret: Option<String>,
    pub timeout: Option<TimeoutField>,
}

impl TryFrom<&SwapScriptRequest> for SwapScriptParams {
    type Error = SwapError;

    fn try_from(req: &SwapScriptRequest) -> Result<Self> {
        let claim_key = parse_swap_key(
            "claim",
            req.claim_private_key.as_deref(),
            req.claim_public_key.as_deref(),
        )?;
        let refund_key = parse_swap_key(
            "refund",
            req.refund_private_key.as_deref(),
            req.refund_public_key.as_deref(),
        )?;

        let lock = match (req.hash.as_deref(), req.secret.as_deref()) {
            (Some(hash), None) => {
                let hash = decode_array::<32>("hash", hash)?;
                SwapLock::Hash(sha256::Hash::from_byte_array(hash))
            }
            (None, Some(secret)) => SwapLock::Preimage(decode_array::<PREIMAGE_LEN>("secret", secret)?),
            (None, None) => {
                return Err(SwapError::InvalidScriptParameters(
                    "expected hash or secret".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(SwapError::InvalidScriptParameters(
                    "expected either hash or secret, not both".to_string(),
                ));
            }
        };

        let timeout = req
            .timeout
            .as_ref()
            .ok_or_else(|| SwapError::InvalidScriptParameters("expected timeout".to_string()))?
            .to_height()?;

        Ok(Self::new(claim_key, refund_key, lock, timeout))
    }
}

fn parse_swap_key(role: &str, private: Option<&str>, public: Option<&str>) -> Result<SwapKey> {
    match (private, public) {
        (Some(private), None) => {
            let bytes = decode_array::<32>(role, private)?;
            let key = SecretKey::from_slice(&bytes).map_err(|e| {
                SwapError::InvalidScriptParameters(format!("invalid {role} private key: {e}"))
            })?;
            Ok(SwapKey::Private(key))
        }
        (None, Some(public)) => {
            let bytes = hex::decode(public).map_err(|e| {
                SwapError::InvalidScriptParameters(format!("invalid {role} public key hex: {e}"))
            })?;
            let key = PublicKey::from_slice(&bytes).map_err(|e| {
                SwapError::InvalidScriptParameters(format!("invalid {role} public key: {e}"))
            })?;
            Ok(SwapKey::Public(key))
        }
        (None, None) => Err(SwapError::InvalidScriptParameters(format!(
            "expected {role} private or public key"
        ))),
        (Some(_), Some(_)) => Err(SwapError::InvalidScriptParameters(format!(
            "expected either {role} private or public key, not both"
        ))),
    }
}

fn decode_array<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(value)
        .map_err(|e| SwapError::InvalidScriptParameters(format!("invalid {field} hex: {e}")))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        SwapError::InvalidScriptParameters(format!(
            "expected {N} byte {field}, got {} bytes",
            bytes.len()
        ))
    })
}
