pub mod claim;
pub mod fees;
pub mod refund;
pub mod sizing;
pub mod status;
pub mod sweep;
pub mod taproot;
pub mod witness;

use bitcoin::{Amount, OutPoint};
use serde::{Deserialize, Serialize};

pub use claim::{ClaimParams, build_claim_tx};
pub use fees::{FeeCurve, fee_rate, swap_in_fee};
pub use refund::{RefundParams, build_refund_tx};
pub use sizing::{DUST_LIMIT, SweepTarget, size_sweep_outputs};
pub use status::{SwapStateUpdate, SwapStatus, classify_status};
pub use sweep::{SweepKind, classify_sweep};
pub use taproot::{
    TaprootSpend, attach_key_path_signature, build_taproot_claim_tx,
    build_taproot_cooperative_tx, build_taproot_refund_tx, unsigned_taproot_cooperative_tx,
};

/// The swap output being spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapUtxo {
    pub outpoint: OutPoint,
    pub tokens: u64,
}

impl SwapUtxo {
    pub fn amount(&self) -> Amount {
        Amount::from_sat(self.tokens)
    }
}

/// An additional payment carved out of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraOutput {
    pub address: String,
    pub tokens: u64,
}
