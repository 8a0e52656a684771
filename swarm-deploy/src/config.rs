//! Layered deployment configuration.
//!
//! A `deploy.toml` carries a `[default]` section plus one
//! `[networks.<id>]` section per network; resolving a network merges the
//! two field-wise with the network winning. All validation happens here,
//! before any chain interaction.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use alloy_core::hex::FromHex;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{
    utils::{parse_units, ParseUnits},
    Address, Bytes, U256,
};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no config for network '{0}'")]
    UnknownNetwork(String),
    #[error("network '{network}' is missing required field '{field}'")]
    MissingField {
        network: String,
        field: &'static str,
    },
    #[error("invalid total supply '{supply}': {reason}")]
    InvalidSupply { supply: String, reason: String },
    #[error("invalid bytecode artifact {}: {reason}", path.display())]
    BadArtifact { path: PathBuf, reason: String },
    #[error("network '{0}' is backed by a remote rpc url; supply a chain client through the library instead")]
    RemoteBackend(String),
}

/// One configuration section; every field optional so sections layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkOverrides {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub controller: Option<Address>,
    pub initial_account: Option<Address>,
    pub child_chain_manager: Option<Address>,
    /// Whole-token amount as a decimal string, scaled by `decimals`.
    pub total_supply: Option<String>,
    /// Target deployment nonce.
    pub nonce: Option<u64>,
    pub contract: Option<String>,
    pub deployer: Option<Address>,
    pub chain_id: Option<u64>,
    pub url: Option<String>,
    pub artifacts: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default)]
    default: NetworkOverrides,
    #[serde(default)]
    networks: HashMap<String, NetworkOverrides>,
}

fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
    over.clone().or_else(|| base.clone())
}

impl DeployConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Merge `[default]` with `[networks.<network>]`. Unknown networks are
    /// rejected outright, matching the original tables.
    pub fn resolve(&self, network: &str) -> Result<NetworkConfig, ConfigError> {
        let over = self
            .networks
            .get(network)
            .ok_or_else(|| ConfigError::UnknownNetwork(network.to_owned()))?;
        let base = &self.default;
        let missing = |field: &'static str| ConfigError::MissingField {
            network: network.to_owned(),
            field,
        };

        Ok(NetworkConfig {
            network: network.to_owned(),
            contract: pick(&over.contract, &base.contract)
                .unwrap_or_else(|| "SwarmToken".to_owned()),
            token_name: pick(&over.name, &base.name).ok_or_else(|| missing("name"))?,
            symbol: pick(&over.symbol, &base.symbol).ok_or_else(|| missing("symbol"))?,
            decimals: over.decimals.or(base.decimals).unwrap_or(18),
            controller: over
                .controller
                .or(base.controller)
                .ok_or_else(|| missing("controller"))?,
            initial_account: over.initial_account.or(base.initial_account),
            child_chain_manager: over.child_chain_manager.or(base.child_chain_manager),
            total_supply: pick(&over.total_supply, &base.total_supply),
            deployer: over
                .deployer
                .or(base.deployer)
                .ok_or_else(|| missing("deployer"))?,
            nonce: over.nonce.or(base.nonce).ok_or_else(|| missing("nonce"))?,
            chain_id: over.chain_id.or(base.chain_id),
            url: pick(&over.url, &base.url),
            artifacts: PathBuf::from(
                pick(&over.artifacts, &base.artifacts).unwrap_or_else(|| "artifacts".to_owned()),
            ),
        })
    }
}

/// Fully resolved settings for one network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: String,
    pub contract: String,
    pub token_name: String,
    pub symbol: String,
    pub decimals: u8,
    pub controller: Address,
    pub initial_account: Option<Address>,
    pub child_chain_manager: Option<Address>,
    pub total_supply: Option<String>,
    pub deployer: Address,
    pub nonce: u64,
    pub chain_id: Option<u64>,
    pub url: Option<String>,
    pub artifacts: PathBuf,
}

impl NetworkConfig {
    /// Ordered constructor parameters for the configured contract variant.
    ///
    /// The sidechain token takes the child chain manager in place of the
    /// initial account and supply; the mainnet token mints its full supply
    /// to the initial account at construction.
    pub fn constructor_params(&self) -> Result<Vec<DynSolValue>, ConfigError> {
        let missing = |field: &'static str| ConfigError::MissingField {
            network: self.network.clone(),
            field,
        };

        let mut params = vec![
            DynSolValue::Address(self.controller),
            DynSolValue::String(self.token_name.clone()),
            DynSolValue::String(self.symbol.clone()),
            DynSolValue::Uint(U256::from(self.decimals), 8),
        ];

        if self.contract == "SwarmTokenPolygon" {
            params.push(DynSolValue::Address(
                self.child_chain_manager
                    .ok_or_else(|| missing("child_chain_manager"))?,
            ));
        } else {
            params.push(DynSolValue::Address(
                self.initial_account
                    .ok_or_else(|| missing("initial_account"))?,
            ));
            params.push(DynSolValue::Uint(self.total_supply_wei()?, 256));
        }

        Ok(params)
    }

    /// Configured supply scaled to base units.
    pub fn total_supply_wei(&self) -> Result<U256, ConfigError> {
        let raw = self
            .total_supply
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                network: self.network.clone(),
                field: "total_supply",
            })?;
        match parse_units(raw, self.decimals) {
            Ok(ParseUnits::U256(value)) => Ok(value),
            Ok(ParseUnits::I256(_)) => Err(ConfigError::InvalidSupply {
                supply: raw.to_owned(),
                reason: "supply cannot be negative".to_owned(),
            }),
            Err(err) => Err(ConfigError::InvalidSupply {
                supply: raw.to_owned(),
                reason: err.to_string(),
            }),
        }
    }

    /// Creation bytecode from `<artifacts>/<contract>.bin` (hex, with or
    /// without a 0x prefix).
    pub fn load_bytecode(&self) -> Result<Bytes, ConfigError> {
        let path = self.artifacts.join(format!("{}.bin", self.contract));
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let trimmed = content.trim().trim_start_matches("0x");
        Bytes::from_hex(trimmed).map_err(|err| ConfigError::BadArtifact {
            path,
            reason: err.to_string(),
        })
    }
}
