use std::str::FromStr as _;

use anyhow::{Context as _, Result};
use bitcoin::consensus::encode::{deserialize_hex, serialize_hex};
use bitcoin::hashes::Hash as _;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use bitcoin::{OutPoint, ScriptBuf, Transaction, Txid, XOnlyPublicKey};
use clap::{Parser as _, Subcommand, ValueEnum};
use ln_chain_swap::htlc::{
    ScriptBranches, SwapKey, SwapScript, SwapScriptParams, SwapScriptRequest, TimeoutField,
    joint_public_key, parse_swap_script, script_version,
};
use ln_chain_swap::lightning::invoice::{amount_sat_from_bolt11, swap_lock_from_bolt11};
use ln_chain_swap::network::SwapNetwork;
use ln_chain_swap::swap::{
    ClaimParams, ExtraOutput, RefundParams, SwapStateUpdate, SwapUtxo, SweepTarget,
    build_claim_tx, build_refund_tx, classify_status, classify_sweep, fee_rate, swap_in_fee,
};
use serde_json::json;

#[derive(Debug, clap::Parser)]
struct Args {
    #[arg(long, value_enum, default_value_t = SwapNetwork::Regtest)]
    network: SwapNetwork,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScriptVersion {
    V1,
    V2,
    Taproot,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a swap script and derive its address.
    Script {
        #[arg(long, value_enum, default_value_t = ScriptVersion::V2)]
        version: ScriptVersion,

        #[arg(long)]
        claim_private_key: Option<String>,

        #[arg(long)]
        claim_public_key: Option<String>,

        #[arg(long)]
        refund_private_key: Option<String>,

        #[arg(long)]
        refund_public_key: Option<String>,

        #[arg(long)]
        hash: Option<String>,

        #[arg(long)]
        secret: Option<String>,

        /// Take the swap hash from a BOLT11 invoice.
        #[arg(long, conflicts_with_all = ["hash", "secret"])]
        invoice: Option<String>,

        #[arg(long)]
        timeout: String,

        /// Taproot internal key; defaults to the sum of the claim and refund keys.
        #[arg(long)]
        internal_key: Option<String>,
    },
    /// Recognize a legacy swap script.
    ScriptVersion {
        #[arg(long)]
        script: String,
    },
    /// Tell whether a transaction sweeps a swap output, and how.
    ClassifySweep {
        #[arg(long)]
        tx: String,
    },
    FeeRate {
        #[arg(long)]
        before: u32,

        #[arg(long)]
        cursor: u32,

        #[arg(long, default_value_t = 1.0)]
        base_fee: f64,

        #[arg(long)]
        multiplier: f64,
    },
    SwapInFee {
        #[arg(long)]
        base_fee: u64,

        /// Parts per million of the swapped tokens.
        #[arg(long)]
        fee_rate: u64,

        #[arg(long)]
        tokens: u64,
    },
    Status {
        #[arg(long)]
        state: String,

        #[arg(long)]
        timestamp_ns: u64,
    },
    /// Sign a hash-lock sweep of a P2WSH swap output.
    Claim {
        #[command(flatten)]
        spend: SpendArgs,

        #[arg(long)]
        private_key: String,

        #[arg(long)]
        preimage: String,

        #[arg(long)]
        current_block_height: Option<u32>,
    },
    /// Build a timeout sweep of a P2WSH swap output; unsigned without `--private-key`.
    Refund {
        #[command(flatten)]
        spend: SpendArgs,

        #[arg(long, required_unless_present = "public_key")]
        private_key: Option<String>,

        #[arg(long)]
        public_key: Option<String>,

        #[arg(long, default_value_t = false)]
        nested: bool,
    },
}

#[derive(Debug, clap::Args)]
struct SpendArgs {
    #[arg(long)]
    script: String,

    #[arg(long)]
    txid: String,

    #[arg(long)]
    vout: u32,

    #[arg(long)]
    tokens: u64,

    #[arg(long)]
    address: String,

    #[arg(long)]
    fee_rate: f64,

    /// Additional `address:tokens` outputs.
    #[arg(long = "send", value_parser = parse_extra_output)]
    sends: Vec<ExtraOutput>,
}

impl SpendArgs {
    fn witness_script(&self) -> Result<ScriptBuf> {
        ScriptBuf::from_hex(&self.script).context("decode witness script hex")
    }

    fn utxo(&self) -> Result<SwapUtxo> {
        let txid = Txid::from_str(&self.txid).context("parse txid")?;
        Ok(SwapUtxo {
            outpoint: OutPoint::new(txid, self.vout),
            tokens: self.tokens,
        })
    }

    fn sweep(&self) -> SweepTarget {
        SweepTarget::new(self.address.clone(), self.fee_rate).with_extra_outputs(self.sends.clone())
    }
}

fn parse_extra_output(s: &str) -> std::result::Result<ExtraOutput, String> {
    let (address, tokens) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected address:tokens, got {s:?}"))?;
    let tokens = tokens
        .parse::<u64>()
        .map_err(|e| format!("invalid tokens in {s:?}: {e}"))?;
    Ok(ExtraOutput {
        address: address.to_string(),
        tokens,
    })
}

fn secret_key(hex_key: &str) -> Result<SecretKey> {
    let bytes = hex::decode(hex_key).context("decode private key hex")?;
    SecretKey::from_slice(&bytes).context("parse private key")
}

fn main() -> Result<()> {
    ln_chain_swap::logging::init().ok();
    let args = Args::parse();
    let network = args.network;
    let secp = Secp256k1::new();

    let out = match args.command {
        Command::Script {
            version,
            claim_private_key,
            claim_public_key,
            refund_private_key,
            refund_public_key,
            hash,
            secret,
            invoice,
            timeout,
            internal_key,
        } => {
            let (hash, invoice_tokens) = match invoice {
                Some(invoice) => (
                    Some(hex::encode(swap_lock_from_bolt11(&invoice)?.hash().to_byte_array())),
                    amount_sat_from_bolt11(&invoice)?,
                ),
                None => (hash, None),
            };
            let request = SwapScriptRequest {
                claim_private_key,
                claim_public_key,
                refund_private_key,
                refund_public_key,
                hash,
                secret,
                timeout: Some(TimeoutField::Text(timeout)),
            };
            let params = SwapScriptParams::try_from(&request)?;

            match version {
                ScriptVersion::V1 | ScriptVersion::V2 => {
                    let script = match version {
                        ScriptVersion::V1 => SwapScript::v1(&secp, &params)?,
                        _ => SwapScript::v2(&secp, &params)?,
                    };
                    json!({
                      "kind": script.kind(),
                      "script": script.script().to_hex_string(),
                      "hash": script.hash().to_string(),
                      "timeout": script.timeout().to_consensus_u32(),
                      "invoice_tokens": invoice_tokens,
                      "p2wsh_address": script.p2wsh_address(network).to_string(),
                      "nested_address": script.nested_address(network).to_string(),
                    })
                }
                ScriptVersion::Taproot => {
                    let branches = ScriptBranches::new(&secp, &params)?;
                    let internal_key = match internal_key {
                        Some(key) => XOnlyPublicKey::from_str(&key).context("parse internal key")?,
                        None => default_internal_key(&secp, &params)?,
                    };
                    json!({
                      "claim_leaf": branches.claim.script().to_hex_string(),
                      "refund_leaf": branches.refund.script().to_hex_string(),
                      "branch_hash": branches.hash.to_string(),
                      "hash": branches.claim.hash().to_string(),
                      "internal_key": internal_key.to_string(),
                      "invoice_tokens": invoice_tokens,
                      "address": branches.address(&secp, internal_key, network)?.to_string(),
                    })
                }
            }
        }
        Command::ScriptVersion { script } => {
            let script = ScriptBuf::from_hex(&script).context("decode script hex")?;
            let details = script_version(&script)
                .is_some()
                .then(|| parse_swap_script(&script))
                .transpose()?;
            json!({
              "version": script_version(&script),
              "details": details,
            })
        }
        Command::ClassifySweep { tx } => {
            let tx: Transaction = deserialize_hex(&tx).context("decode transaction hex")?;
            json!({
              "txid": tx.compute_txid().to_string(),
              "sweep": classify_sweep(&tx),
            })
        }
        Command::FeeRate {
            before,
            cursor,
            base_fee,
            multiplier,
        } => json!({ "rate": fee_rate(before, cursor, base_fee, multiplier)? }),
        Command::SwapInFee {
            base_fee,
            fee_rate,
            tokens,
        } => json!({ "fee": swap_in_fee(base_fee, fee_rate, tokens) }),
        Command::Status {
            state,
            timestamp_ns,
        } => {
            let status = classify_status(&SwapStateUpdate {
                state: Some(state),
                timestamp_ns: Some(timestamp_ns),
            })?;
            serde_json::to_value(status)?
        }
        Command::Claim {
            spend,
            private_key,
            preimage,
            current_block_height,
        } => {
            let witness_script = spend.witness_script()?;
            let preimage = <[u8; 32]>::try_from(
                hex::decode(&preimage).context("decode preimage hex")?.as_slice(),
            )
            .context("preimage must be 32 bytes")?;
            let tx = build_claim_tx(
                &secp,
                &ClaimParams {
                    witness_script: &witness_script,
                    utxo: spend.utxo()?,
                    preimage,
                    claim_key: secret_key(&private_key)?,
                    sweep: spend.sweep(),
                    current_block_height,
                    network,
                },
            )?;
            tracing::info!(txid = %tx.compute_txid(), "claim transaction ready");
            tx_json(&tx)
        }
        Command::Refund {
            spend,
            private_key,
            public_key,
            nested,
        } => {
            let witness_script = spend.witness_script()?;
            let refund_key = match (private_key, public_key) {
                (Some(key), _) => SwapKey::Private(secret_key(&key)?),
                (None, Some(key)) => SwapKey::Public(
                    PublicKey::from_str(&key).context("parse refund public key")?,
                ),
                (None, None) => anyhow::bail!("expected refund private or public key"),
            };
            let tx = build_refund_tx(
                &secp,
                &RefundParams {
                    witness_script: &witness_script,
                    utxo: spend.utxo()?,
                    refund_key,
                    sweep: spend.sweep(),
                    is_nested: nested,
                    network,
                },
            )?;
            tracing::info!(txid = %tx.compute_txid(), "refund transaction ready");
            tx_json(&tx)
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn default_internal_key(
    secp: &Secp256k1<bitcoin::secp256k1::All>,
    params: &SwapScriptParams,
) -> Result<XOnlyPublicKey> {
    let joint = joint_public_key(
        &params.claim_key.public_key(secp),
        &params.refund_key.public_key(secp),
    )?;
    Ok(joint.x_only_public_key().0)
}

fn tx_json(tx: &Transaction) -> serde_json::Value {
    json!({
      "txid": tx.compute_txid().to_string(),
      "transaction": serialize_hex(tx),
      "outputs": tx
          .output
          .iter()
          .map(|o| json!({ "script": o.script_pubkey.to_hex_string(), "tokens": o.value.to_sat() }))
          .collect::<Vec<_>>(),
      "sweep": classify_sweep(tx),
    })
}
