use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::types::{Token, TokenId};
use crate::errors::{WarpError, WarpResult};
use crate::provider::MultiProtocolProvider;
use crate::warp_config::WarpCoreConfig;

/// 连接所使用的桥接路径
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Hyperlane,
    Ibc,
    #[serde(rename = "ibc-hyperlane")]
    IbcHyperlane,
}

/// 有向边：起点 token 经由桥接合约可到达的目标 token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConnection {
    pub token: Arc<Token>,
    pub connection_type: ConnectionType,
}

/// token 连接图
///
/// 在配置装配时一次性构建，之后只读。
#[derive(Debug, Clone)]
pub struct WarpCore {
    provider: MultiProtocolProvider,
    /// 按注册顺序保存的 token
    tokens: Vec<Arc<Token>>,
    /// 邻接表：token -> 出边
    adjacency_list: HashMap<TokenId, Vec<TokenConnection>>,
    options: Option<serde_json::Value>,
}

impl WarpCore {
    /// 不含任何 token 的图
    pub fn new(provider: MultiProtocolProvider) -> Self {
        Self {
            provider,
            tokens: Vec::new(),
            adjacency_list: HashMap::new(),
            options: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(MultiProtocolProvider::empty())
    }

    /// 从合并后的路由配置构建图
    ///
    /// token 的协议取自链元数据；连接字符串必须指向已注册的 token。
    pub fn from_config(provider: MultiProtocolProvider, config: &WarpCoreConfig) -> WarpResult<Self> {
        info!("开始构建 token 连接图，token 数量: {}", config.tokens.len());

        let mut core = Self::new(provider);
        core.options = config.options.clone();
        let mut index: HashMap<TokenId, usize> = HashMap::new();

        for token_config in &config.tokens {
            let protocol = core.provider.get_protocol(&token_config.chain_name)?;
            if token_config.standard.protocol() != protocol {
                warn!(
                    "token {} 的标准 {} 与链 {} 的协议 {} 不一致",
                    token_config.symbol, token_config.standard, token_config.chain_name, protocol
                );
            }

            let token = Token::new(
                protocol,
                &token_config.chain_name,
                &token_config.address_or_denom,
                token_config.standard,
                &token_config.symbol,
                &token_config.name,
                token_config.decimals,
            )?
            .with_collateral(token_config.collateral_address_or_denom.as_deref())
            .with_logo_uri(token_config.logo_uri.clone());

            let id = token.id();
            match index.get(&id) {
                Some(&position) => {
                    warn!("重复的 token {}，使用后出现的配置", id);
                    core.tokens[position] = Arc::new(token);
                }
                None => {
                    index.insert(id, core.tokens.len());
                    core.tokens.push(Arc::new(token));
                }
            }
        }

        let mut edge_count = 0;
        for token_config in &config.tokens {
            let protocol = core.provider.get_protocol(&token_config.chain_name)?;
            let from = TokenId::new(protocol, &token_config.chain_name, &token_config.address_or_denom);

            for connection in &token_config.connections {
                let target = TokenId::parse(&connection.token)?;
                let position = index.get(&target).ok_or_else(|| {
                    WarpError::schema(
                        "warp core config",
                        format!("connection {} from {} points to an unknown token", target, from),
                    )
                })?;
                let edge = TokenConnection {
                    token: core.tokens[*position].clone(),
                    connection_type: connection.connection_type.unwrap_or_default(),
                };
                core.add_connection(&from, edge);
                edge_count += 1;
            }
        }

        info!(
            "token 连接图构建完成，token 数量: {}, 边数量: {}",
            core.tokens.len(),
            edge_count
        );
        Ok(core)
    }

    fn add_connection(&mut self, from: &TokenId, edge: TokenConnection) {
        let edges = self.adjacency_list.entry(from.clone()).or_default();
        // 同一配置中重复声明的连接只保留一条
        if edges.iter().any(|e| e.token.equals(&edge.token)) {
            debug!("忽略重复连接 {} -> {}", from, edge.token.id());
            return;
        }
        edges.push(edge);
    }

    pub fn provider(&self) -> &MultiProtocolProvider {
        &self.provider
    }

    pub fn tokens(&self) -> &[Arc<Token>] {
        &self.tokens
    }

    pub fn options(&self) -> Option<&serde_json::Value> {
        self.options.as_ref()
    }

    /// 指定 token 的所有出边；没有出边时返回空切片
    pub fn connections_of(&self, token: &Token) -> &[TokenConnection] {
        self.adjacency_list
            .get(&token.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_token(&self, id: &TokenId) -> Option<&Arc<Token>> {
        self.tokens.iter().find(|t| t.id() == *id)
    }

    pub fn find_token(&self, chain: &str, address_or_denom: &str) -> Option<&Arc<Token>> {
        let protocol = self.provider.get_protocol(chain).ok()?;
        self.get_token(&TokenId::new(protocol, chain, address_or_denom))
    }

    /// 起点链上、存在通往目标链连接的所有 token，保持注册顺序
    pub fn get_tokens_for_route(&self, origin: &str, destination: &str) -> Vec<Arc<Token>> {
        self.tokens
            .iter()
            .filter(|t| t.chain_name() == origin)
            .filter(|t| {
                self.connections_of(t)
                    .iter()
                    .any(|c| c.token.chain_name() == destination)
            })
            .cloned()
            .collect()
    }

    /// 指定 token 可以到达的目标链
    pub fn get_connected_chains(&self, token: &Token) -> Vec<String> {
        let mut chains: Vec<String> = Vec::new();
        for connection in self.connections_of(token) {
            let chain = connection.token.chain_name().to_string();
            if !chains.contains(&chain) {
                chains.push(chain);
            }
        }
        chains
    }

    /// 获取图的统计信息：(token 数量, 边数量)
    pub fn get_stats(&self) -> (usize, usize) {
        let edge_count = self.adjacency_list.values().map(|edges| edges.len()).sum();
        (self.tokens.len(), edge_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp_config::ChainMetadata;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn provider(chains: &[&str]) -> MultiProtocolProvider {
        let mut metadata = BTreeMap::new();
        for (i, chain) in chains.iter().enumerate() {
            let value = json!({
                "name": chain,
                "protocol": "ethereum",
                "chainId": i + 1,
                "domainId": i + 1,
                "rpcUrls": [{"http": "https://rpc.example.com"}]
            });
            metadata.insert(chain.to_string(), ChainMetadata::from_value(chain, value).unwrap());
        }
        MultiProtocolProvider::new(metadata)
    }

    fn config() -> WarpCoreConfig {
        serde_json::from_value(json!({
            "tokens": [
                {
                    "chainName": "ethereum",
                    "standard": "EvmHypCollateral",
                    "decimals": 6,
                    "symbol": "USDC",
                    "name": "USD Coin",
                    "addressOrDenom": "0xAA",
                    "collateralAddressOrDenom": "0xC0",
                    "connections": [
                        {"token": "ethereum|arbitrum|0xbb"},
                        {"token": "ethereum|base|0xcc"}
                    ]
                },
                {
                    "chainName": "arbitrum",
                    "standard": "EvmHypSynthetic",
                    "decimals": 6,
                    "symbol": "USDC",
                    "name": "USD Coin",
                    "addressOrDenom": "0xBB",
                    "connections": [{"token": "ethereum|ethereum|0xaa"}]
                },
                {
                    "chainName": "base",
                    "standard": "EvmHypSynthetic",
                    "decimals": 6,
                    "symbol": "USDC",
                    "name": "USD Coin",
                    "addressOrDenom": "0xCC"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_core() {
        let core = WarpCore::empty();
        assert_eq!(core.get_stats(), (0, 0));
        assert!(core.tokens().is_empty());
    }

    #[test]
    fn test_build_from_config() {
        let core = WarpCore::from_config(provider(&["ethereum", "arbitrum", "base"]), &config()).unwrap();
        assert_eq!(core.get_stats(), (3, 3));

        let eth = core.find_token("ethereum", "0xaa").unwrap().clone();
        let arb = core.find_token("arbitrum", "0xbb").unwrap().clone();
        let base = core.find_token("base", "0xcc").unwrap().clone();
        assert_eq!(eth.collateral_address_or_denom(), Some("0xC0"));
        assert!(core.connections_of(&eth)[0].token.equals(&arb));
        assert_eq!(core.get_connected_chains(&arb), vec!["ethereum"]);
        assert!(core.connections_of(&base).is_empty());
        assert_eq!(core.get_connected_chains(&eth), vec!["arbitrum", "base"]);
    }

    #[test]
    fn test_tokens_for_route() {
        let core = WarpCore::from_config(provider(&["ethereum", "arbitrum", "base"]), &config()).unwrap();
        let route_tokens = core.get_tokens_for_route("ethereum", "base");
        assert_eq!(route_tokens.len(), 1);
        assert_eq!(route_tokens[0].chain_name(), "ethereum");
        assert!(core.get_tokens_for_route("base", "ethereum").is_empty());
    }

    #[test]
    fn test_dangling_connection_rejected() {
        let mut config = config();
        config.tokens[2].connections.push(crate::warp_config::ConnectionConfig {
            token: "ethereum|optimism|0xdd".to_string(),
            connection_type: None,
        });
        let result = WarpCore::from_config(provider(&["ethereum", "arbitrum", "base"]), &config);
        assert!(matches!(result, Err(WarpError::SchemaValidation { .. })));
    }

    #[test]
    fn test_missing_chain_metadata_rejected() {
        let result = WarpCore::from_config(provider(&["ethereum", "arbitrum"]), &config());
        assert!(matches!(result, Err(WarpError::UnknownChain { .. })));
    }
}
