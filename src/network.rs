use std::fmt;
use std::str::FromStr;

use bitcoin::{Address, Network, ScriptBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SwapError};

/// Chain a swap lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SwapNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl SwapNetwork {
    pub fn bitcoin_network(self) -> Network {
        match self {
            SwapNetwork::Mainnet => Network::Bitcoin,
            SwapNetwork::Testnet => Network::Testnet,
            SwapNetwork::Regtest => Network::Regtest,
        }
    }

    /// Decodes `address` and checks it belongs to this network.
    pub fn parse_address(self, address: &str) -> Option<Address> {
        Address::from_str(address)
            .ok()?
            .require_network(self.bitcoin_network())
            .ok()
    }

    /// Output script of the primary sweep address; failing to decode it is fatal.
    pub fn sweep_script(self, address: &str) -> Result<ScriptBuf> {
        self.parse_address(address)
            .map(|a| a.script_pubkey())
            .ok_or_else(|| SwapError::ExpectedSweepAddressOutputScript(address.to_string()))
    }
}

impl fmt::Display for SwapNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapNetwork::Mainnet => "mainnet",
            SwapNetwork::Testnet => "testnet",
            SwapNetwork::Regtest => "regtest",
        };
        f.write_str(s)
    }
}

impl FromStr for SwapNetwork {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mainnet" | "bitcoin" => Ok(SwapNetwork::Mainnet),
            "testnet" => Ok(SwapNetwork::Testnet),
            "regtest" => Ok(SwapNetwork::Regtest),
            other => Err(SwapError::InvalidScriptParameters(format!(
                "unknown network: {other}"
            ))),
        }
    }
}
