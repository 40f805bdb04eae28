use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::errors::{WarpError, WarpResult};
use crate::warp_config::WarpCoreConfig;

const USER_AGENT: &str = "warp-route/0.1.0";

/// Source of chain metadata and warp route documents
#[async_trait]
pub trait Registry: Send + Sync {
    /// Human readable location, used in logs
    fn uri(&self) -> String;

    /// Raw metadata document for a chain, `None` when the registry has no such chain
    async fn get_chain_metadata(&self, chain: &str) -> WarpResult<Option<Value>>;

    /// Every warp route config known to the registry, validated
    async fn get_warp_routes(&self) -> WarpResult<Vec<WarpCoreConfig>>;
}

/// Registry served over HTTP
pub struct HttpRegistry {
    client: Client,
    base_url: String,
    branch: String,
}

impl HttpRegistry {
    /// Create a new HttpRegistry from configuration
    pub fn new(config: &RegistryConfig) -> WarpResult<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| WarpError::ConfigFetch {
                reason: format!("invalid proxy {}: {}", proxy, e),
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
            branch: config.branch.clone(),
        })
    }

    async fn get_json(&self, path: &str) -> WarpResult<Option<Value>> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} (branch {})", url, self.branch);

        let response = self
            .client
            .get(&url)
            .query(&[("branch", self.branch.as_str())])
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(WarpError::ConfigFetch {
                reason: format!("{} returned {}", url, response.status()),
            });
        }

        let value: Value = response.json().await?;
        Ok(Some(value))
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    fn uri(&self) -> String {
        format!("{}@{}", self.base_url, self.branch)
    }

    async fn get_chain_metadata(&self, chain: &str) -> WarpResult<Option<Value>> {
        self.get_json(&format!("chains/{}/metadata", chain)).await
    }

    async fn get_warp_routes(&self) -> WarpResult<Vec<WarpCoreConfig>> {
        let value = self
            .get_json("warp-routes")
            .await?
            .ok_or_else(|| WarpError::ConfigFetch {
                reason: format!("{} has no warp routes", self.uri()),
            })?;
        let routes = parse_warp_routes(value)?;
        info!("Fetched {} warp routes from {}", routes.len(), self.uri());
        Ok(routes)
    }
}

/// Accepts either a map of route id -> config or a plain list of configs
fn parse_warp_routes(value: Value) -> WarpResult<Vec<WarpCoreConfig>> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(id, config)| WarpCoreConfig::from_value(&format!("warp route {}", id), config))
            .collect(),
        Value::Array(list) => list
            .into_iter()
            .enumerate()
            .map(|(i, config)| WarpCoreConfig::from_value(&format!("warp route #{}", i), config))
            .collect(),
        other => Err(WarpError::schema(
            "warp routes",
            format!("expected object or array, got {}", other),
        )),
    }
}

/// On-disk layout accepted by [`StaticRegistry::from_file`]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryFile {
    #[serde(default)]
    chains: BTreeMap<String, Value>,
    #[serde(default)]
    warp_routes: Value,
}

/// In-memory registry, used for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    chains: BTreeMap<String, Value>,
    warp_routes: Vec<WarpCoreConfig>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load registry documents from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> WarpResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| WarpError::ConfigFetch {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let file: RegistryFile = serde_json::from_str(&content)
            .map_err(|e| WarpError::schema(path.display().to_string(), e.to_string()))?;

        let warp_routes = match file.warp_routes {
            Value::Null => Vec::new(),
            value => parse_warp_routes(value)?,
        };

        info!(
            "Loaded {} chains and {} warp routes from {}",
            file.chains.len(),
            warp_routes.len(),
            path.display()
        );
        Ok(Self {
            chains: file.chains,
            warp_routes,
        })
    }

    pub fn with_chain(mut self, chain: &str, metadata: Value) -> Self {
        self.chains.insert(chain.to_string(), metadata);
        self
    }

    pub fn with_warp_route(mut self, config: WarpCoreConfig) -> Self {
        self.warp_routes.push(config);
        self
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    fn uri(&self) -> String {
        "static".to_string()
    }

    async fn get_chain_metadata(&self, chain: &str) -> WarpResult<Option<Value>> {
        Ok(self.chains.get(chain).cloned())
    }

    async fn get_warp_routes(&self) -> WarpResult<Vec<WarpCoreConfig>> {
        Ok(self.warp_routes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(chain: &str, address: &str) -> Value {
        json!({
            "tokens": [{
                "chainName": chain,
                "standard": "EvmHypNative",
                "decimals": 18,
                "symbol": "ETH",
                "name": "Ether",
                "addressOrDenom": address
            }]
        })
    }

    #[test]
    fn test_parse_warp_routes_map_and_list() {
        let map = json!({ "ETH/ethereum-arbitrum": route("ethereum", "0x1") });
        assert_eq!(parse_warp_routes(map).unwrap().len(), 1);

        let list = json!([route("ethereum", "0x1"), route("arbitrum", "0x2")]);
        assert_eq!(parse_warp_routes(list).unwrap().len(), 2);

        assert!(matches!(
            parse_warp_routes(json!("nope")),
            Err(WarpError::SchemaValidation { .. })
        ));
        assert!(parse_warp_routes(json!([{"tokens": "bad"}])).is_err());
    }

    #[tokio::test]
    async fn test_static_registry() {
        let registry = StaticRegistry::new()
            .with_chain("ethereum", json!({"name": "ethereum"}))
            .with_warp_route(WarpCoreConfig::from_value("r", route("ethereum", "0x1")).unwrap());

        assert!(registry.get_chain_metadata("ethereum").await.unwrap().is_some());
        assert!(registry.get_chain_metadata("arbitrum").await.unwrap().is_none());
        assert_eq!(registry.get_warp_routes().await.unwrap().len(), 1);
    }

    #[test]
    fn test_static_registry_from_file() {
        let path = std::env::temp_dir().join("warp_route_registry_test.json");
        let content = json!({
            "chains": {"ethereum": {"name": "ethereum"}},
            "warpRoutes": {"ETH/ethereum": route("ethereum", "0x1")}
        });
        fs::write(&path, content.to_string()).unwrap();

        let registry = StaticRegistry::from_file(&path).unwrap();
        assert_eq!(registry.chains.len(), 1);
        assert_eq!(registry.warp_routes.len(), 1);

        fs::remove_file(&path).ok();
        assert!(matches!(
            StaticRegistry::from_file(&path),
            Err(WarpError::ConfigFetch { .. })
        ));
    }

    #[test]
    fn test_http_registry_rejects_bad_proxy() {
        let config = RegistryConfig {
            url: "https://registry.example.com/".to_string(),
            branch: "main".to_string(),
            proxy: Some("::not a proxy::".to_string()),
            timeout_seconds: 5,
        };
        assert!(HttpRegistry::new(&config).is_err());

        let config = RegistryConfig { proxy: None, ..config };
        let registry = HttpRegistry::new(&config).unwrap();
        assert_eq!(registry.uri(), "https://registry.example.com@main");
    }
}
