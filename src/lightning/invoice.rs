use std::str::FromStr as _;

use bitcoin::hashes::{Hash as _, sha256};
use lightning_invoice::Bolt11Invoice;

use crate::error::{Result, SwapError};
use crate::htlc::SwapLock;

fn parse_bolt11(invoice: &str) -> Result<Bolt11Invoice> {
    Bolt11Invoice::from_str(invoice)
        .map_err(|e| SwapError::InvalidScriptParameters(format!("parse BOLT11 invoice: {e:?}")))
}

pub fn payment_hash_from_bolt11(invoice: &str) -> Result<sha256::Hash> {
    let invoice = parse_bolt11(invoice)?;
    Ok(sha256::Hash::from_byte_array(
        invoice.payment_hash().to_byte_array(),
    ))
}

/// Hash lock of a swap that pays `invoice` off-chain.
pub fn swap_lock_from_bolt11(invoice: &str) -> Result<SwapLock> {
    payment_hash_from_bolt11(invoice).map(SwapLock::Hash)
}

pub fn amount_sat_from_bolt11(invoice: &str) -> Result<Option<u64>> {
    let invoice = parse_bolt11(invoice)?;
    Ok(invoice.amount_milli_satoshis().map(|msat| msat / 1_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_invoice_is_rejected() {
        assert!(matches!(
            payment_hash_from_bolt11("lnbc1notaninvoice"),
            Err(SwapError::InvalidScriptParameters(_))
        ));
        assert!(amount_sat_from_bolt11("").is_err());
    }
}
