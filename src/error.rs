use thiserror::Error;

/// Errors raised while building or classifying swap scripts and transactions.
///
/// Nothing here is retried internally; the caller decides whether to rebuild
/// with different parameters (a lower fee rate, a bigger UTXO) or give up.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("invalid script parameters: {0}")]
    InvalidScriptParameters(String),

    #[error("script composition failed: {0}")]
    ScriptCompositionError(String),

    #[error("insufficient funds for sweep: funding={funding} sweep={sweep}")]
    InsufficientFundsForSweep { funding: u64, sweep: u64 },

    #[error("expected sweep address output script: {0}")]
    ExpectedSweepAddressOutputScript(String),

    #[error("unknown swap script type")]
    UnknownSwapScriptType,

    #[error("invalid fee curve parameters: before={before} multiplier={multiplier}")]
    InvalidFeeCurveParameters { before: u32, multiplier: f64 },

    #[error("missing swap state or timestamp")]
    MissingSwapStateOrTimestamp,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("taproot construction failed: {0}")]
    Taproot(String),
}

impl From<bitcoin::secp256k1::Error> for SwapError {
    fn from(err: bitcoin::secp256k1::Error) -> Self {
        Self::Signing(err.to_string())
    }
}

impl From<bitcoin::sighash::TaprootError> for SwapError {
    fn from(err: bitcoin::sighash::TaprootError) -> Self {
        Self::Signing(err.to_string())
    }
}

impl From<bitcoin::transaction::InputsIndexError> for SwapError {
    fn from(err: bitcoin::transaction::InputsIndexError) -> Self {
        Self::Signing(err.to_string())
    }
}

impl From<bitcoin::taproot::TaprootBuilderError> for SwapError {
    fn from(err: bitcoin::taproot::TaprootBuilderError) -> Self {
        Self::Taproot(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SwapError>;
