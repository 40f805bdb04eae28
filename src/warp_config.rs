//! Registry-shaped configuration documents.
//!
//! Chain metadata and warp route configs arrive as JSON from the registry and
//! are validated here before anything else touches them. Overrides stay as raw
//! JSON so they can be deep-merged on top of the registry documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::connection_graph::ConnectionType;
use crate::core::types::{ProtocolType, TokenStandard};
use crate::errors::{WarpError, WarpResult};

/// Chain name -> partial metadata override. `None` means "no override".
pub type ChainMetadataOverrides = BTreeMap<String, Option<Value>>;

/// Whole-route-set overrides, appended after the registry routes.
pub type WarpCoreConfigOverrides = Vec<WarpCoreConfig>;

/// EVM chains use numeric ids, Cosmos chains use string ids
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChainId {
    Number(u64),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcUrl {
    pub http: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeToken {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denom: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockExplorer {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    pub name: String,
    pub protocol: ProtocolType,
    pub chain_id: ChainId,
    pub domain_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub rpc_urls: Vec<RpcUrl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rest_urls: Vec<RpcUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_token: Option<NativeToken>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_explorers: Vec<BlockExplorer>,
    #[serde(default)]
    pub is_testnet: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    /// Fields this crate does not interpret are carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChainMetadata {
    /// Parse and validate a metadata document for `chain`.
    pub fn from_value(chain: &str, value: Value) -> WarpResult<Self> {
        let document = format!("chain metadata {}", chain);
        let metadata: ChainMetadata = serde_json::from_value(value)
            .map_err(|e| WarpError::schema(document.clone(), e.to_string()))?;

        if metadata.name != chain {
            return Err(WarpError::schema(
                document,
                format!("name {} does not match chain key", metadata.name),
            ));
        }
        if metadata.rpc_urls.is_empty() {
            return Err(WarpError::schema(document, "at least one rpc url is required"));
        }
        if let Some(bad) = metadata
            .rpc_urls
            .iter()
            .find(|rpc| url::Url::parse(&rpc.http).is_err())
        {
            return Err(WarpError::schema(
                document,
                format!("invalid rpc url {}", bad.http),
            ));
        }

        Ok(metadata)
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `protocol|chain|address`
    pub token: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<ConnectionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    pub chain_name: String,
    pub standard: TokenStandard,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub address_or_denom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_address_or_denom: Option<String>,
    #[serde(default, rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<ConnectionConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WarpCoreConfig {
    pub tokens: Vec<TokenConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl WarpCoreConfig {
    /// Parse and validate a warp route document.
    pub fn from_value(document: &str, value: Value) -> WarpResult<Self> {
        let config: WarpCoreConfig = serde_json::from_value(value)
            .map_err(|e| WarpError::schema(document, e.to_string()))?;
        config.validate(document)?;
        Ok(config)
    }

    pub fn validate(&self, document: &str) -> WarpResult<()> {
        for token in &self.tokens {
            if token.chain_name.trim().is_empty() {
                return Err(WarpError::schema(document, "token chainName cannot be empty"));
            }
            if token.address_or_denom.trim().is_empty() {
                return Err(WarpError::schema(
                    document,
                    format!("token {} on {} has no addressOrDenom", token.symbol, token.chain_name),
                ));
            }
        }
        Ok(())
    }

    /// Distinct chain names in first-appearance order
    pub fn chain_names(&self) -> Vec<String> {
        let mut chains: Vec<String> = Vec::new();
        for token in &self.tokens {
            if !chains.contains(&token.chain_name) {
                chains.push(token.chain_name.clone());
            }
        }
        chains
    }
}

/// Caller-supplied overrides as read from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridesFile {
    #[serde(default)]
    pub chain_metadata_overrides: ChainMetadataOverrides,
    #[serde(default)]
    pub warp_core_config_overrides: WarpCoreConfigOverrides,
}
