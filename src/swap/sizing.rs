use bitcoin::{Amount, ScriptBuf, Transaction, TxOut, Weight};
use serde::{Deserialize, Serialize};

use super::ExtraOutput;
use crate::error::{Result, SwapError};
use crate::network::SwapNetwork;

/// Outputs at or below this value are not relayed.
pub const DUST_LIMIT: u64 = 546;
/// Floor of a lone sweep output.
pub const MIN_SWEEP_TOKENS: u64 = 2 * DUST_LIMIT;

/// Where a sweep pays to and how much it pays the miners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTarget {
    pub address: String,
    /// Tokens per vbyte.
    pub fee_rate: f64,
    #[serde(default)]
    pub extra_outputs: Vec<ExtraOutput>,
    /// Refuse to build when the sweep output would come out below this.
    #[serde(default)]
    pub min_tokens: Option<u64>,
}

impl SweepTarget {
    pub fn new(address: impl Into<String>, fee_rate: f64) -> Self {
        Self {
            address: address.into(),
            fee_rate,
            extra_outputs: Vec::new(),
            min_tokens: None,
        }
    }

    pub fn with_extra_outputs(mut self, extra_outputs: Vec<ExtraOutput>) -> Self {
        self.extra_outputs = extra_outputs;
        self
    }

    pub fn with_min_tokens(mut self, min_tokens: u64) -> Self {
        self.min_tokens = Some(min_tokens);
        self
    }
}

/// Tokens paid at `fee_rate` tokens/vbyte for `weight`, unrounded.
pub fn fee_for_weight(fee_rate: f64, weight: Weight) -> f64 {
    fee_rate * weight.to_wu() as f64 / 4.0
}

/// Computes the outputs of a sweep of `funding` tokens.
///
/// `template` must already carry worst-case placeholder witnesses (and any
/// scriptSig) on its inputs so its weight matches the signed transaction.
/// Extra outputs are all dropped together when paying them would leave the
/// sweep output at or below dust, or under `min_tokens`.
pub fn size_sweep_outputs(
    template: &Transaction,
    funding: u64,
    sweep_script: ScriptBuf,
    target: &SweepTarget,
    network: SwapNetwork,
) -> Result<Vec<TxOut>> {
    if !target.fee_rate.is_finite() || target.fee_rate < 0.0 {
        return Err(SwapError::InvalidScriptParameters(format!(
            "invalid fee rate: {}",
            target.fee_rate
        )));
    }

    let sweep_output = |tokens: u64| TxOut {
        value: Amount::from_sat(tokens),
        script_pubkey: sweep_script.clone(),
    };

    let mut single = template.clone();
    single.output = vec![sweep_output(0)];
    let fee = fee_for_weight(target.fee_rate, single.weight()).ceil();
    let remainder = funding as f64 - fee;
    let sweep_tokens = if remainder > MIN_SWEEP_TOKENS as f64 {
        remainder.ceil() as u64
    } else {
        MIN_SWEEP_TOKENS
    };

    tracing::debug!(
        funding,
        fee,
        sweep_tokens,
        weight = single.weight().to_wu(),
        "sized single output sweep"
    );

    if sweep_tokens > funding {
        return Err(SwapError::InsufficientFundsForSweep {
            funding,
            sweep: sweep_tokens,
        });
    }
    if let Some(min_tokens) = target.min_tokens
        && sweep_tokens < min_tokens
    {
        return Err(SwapError::InsufficientFundsForSweep {
            funding,
            sweep: sweep_tokens,
        });
    }

    let single_outputs = vec![sweep_output(sweep_tokens)];

    let extras: Vec<TxOut> = target
        .extra_outputs
        .iter()
        .filter_map(|extra| {
            if extra.tokens <= DUST_LIMIT {
                tracing::debug!(address = %extra.address, tokens = extra.tokens, "dropping dust extra output");
                return None;
            }
            let Some(address) = network.parse_address(&extra.address) else {
                tracing::debug!(address = %extra.address, "dropping undecodable extra output");
                return None;
            };
            Some(TxOut {
                value: Amount::from_sat(extra.tokens),
                script_pubkey: address.script_pubkey(),
            })
        })
        .collect();

    if extras.is_empty() {
        return Ok(single_outputs);
    }

    let extra_tokens: u128 = extras.iter().map(|o| u128::from(o.value.to_sat())).sum();

    let mut multi = template.clone();
    multi.output = std::iter::once(sweep_output(0))
        .chain(extras.iter().cloned())
        .collect();
    let multi_fee = fee_for_weight(target.fee_rate, multi.weight());
    let multi_remainder = funding as f64 - multi_fee - extra_tokens as f64;

    if multi_remainder <= DUST_LIMIT as f64 {
        tracing::debug!(
            funding,
            multi_fee,
            extra_tokens = %extra_tokens,
            "extra outputs leave dust sweep, falling back to single output"
        );
        return Ok(single_outputs);
    }
    if let Some(min_tokens) = target.min_tokens
        && multi_remainder.ceil() < min_tokens as f64
    {
        tracing::debug!(
            funding,
            multi_fee,
            min_tokens,
            "extra outputs push sweep under caller minimum, falling back to single output"
        );
        return Ok(single_outputs);
    }

    let mut outputs = multi.output;
    outputs[0].value = Amount::from_sat(multi_remainder.ceil() as u64);
    Ok(outputs)
}
