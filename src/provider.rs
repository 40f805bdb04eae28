use ethers::providers::{Http, Provider};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::types::ProtocolType;
use crate::errors::{WarpError, WarpResult};
use crate::warp_config::ChainMetadata;

/// RPC 请求默认超时
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// 绑定到一份合并后链元数据的多协议 provider
///
/// 每次元数据变化都重新构造，不做增量更新。
#[derive(Debug, Clone)]
pub struct MultiProtocolProvider {
    metadata: BTreeMap<String, Arc<ChainMetadata>>,
    rpc_timeout: Duration,
}

impl MultiProtocolProvider {
    pub fn new(metadata: BTreeMap<String, ChainMetadata>) -> Self {
        Self {
            metadata: metadata
                .into_iter()
                .map(|(name, m)| (name, Arc::new(m)))
                .collect(),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }

    /// 空 provider，用于装配失败后的默认状态
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    pub fn chain_names(&self) -> Vec<String> {
        self.metadata.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn try_get_chain_metadata(&self, chain: &str) -> Option<&Arc<ChainMetadata>> {
        self.metadata.get(chain)
    }

    pub fn get_chain_metadata(&self, chain: &str) -> WarpResult<&Arc<ChainMetadata>> {
        self.metadata.get(chain).ok_or_else(|| WarpError::UnknownChain {
            chain: chain.to_string(),
        })
    }

    pub fn get_protocol(&self, chain: &str) -> WarpResult<ProtocolType> {
        Ok(self.get_chain_metadata(chain)?.protocol)
    }

    pub fn get_domain_id(&self, chain: &str) -> WarpResult<u32> {
        Ok(self.get_chain_metadata(chain)?.domain_id)
    }

    /// 链的首个 RPC 地址
    pub fn rpc_url(&self, chain: &str) -> WarpResult<&str> {
        let metadata = self.get_chain_metadata(chain)?;
        metadata
            .rpc_urls
            .first()
            .map(|rpc| rpc.http.as_str())
            .ok_or_else(|| WarpError::schema(format!("chain metadata {}", chain), "no rpc url"))
    }

    /// 链的首个 REST 地址（Cosmos 链）
    pub fn rest_url(&self, chain: &str) -> WarpResult<&str> {
        let metadata = self.get_chain_metadata(chain)?;
        metadata
            .rest_urls
            .first()
            .map(|rest| rest.http.as_str())
            .ok_or_else(|| WarpError::schema(format!("chain metadata {}", chain), "no rest url"))
    }

    /// 为 EVM 链创建 ethers HTTP provider
    pub fn evm_provider(&self, chain: &str) -> WarpResult<Arc<Provider<Http>>> {
        let protocol = self.get_protocol(chain)?;
        if protocol != ProtocolType::Ethereum {
            return Err(WarpError::unsupported("evm_provider", protocol));
        }
        let url = self.rpc_url(chain)?;
        let provider = Provider::<Http>::try_from(url).map_err(|e| WarpError::ConfigFetch {
            reason: format!("invalid rpc url for {}: {}", chain, e),
        })?;
        Ok(Arc::new(provider))
    }
}
