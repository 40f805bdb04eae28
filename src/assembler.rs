use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::config::Config;
use crate::core::connection_graph::WarpCore;
use crate::core::route_resolver::RouteResolver;
use crate::core::types::{ResolvedTransferRoute, Token, TokenId};
use crate::errors::{WarpError, WarpResult};
use crate::notify::{LogNotifier, Notifier};
use crate::provider::MultiProtocolProvider;
use crate::registry::{HttpRegistry, Registry};
use crate::utils::{obj_filter, obj_merge};
use crate::warp_config::{ChainMetadata, ChainMetadataOverrides, WarpCoreConfig};

/// 装配失败时展示给用户的提示
pub const ASSEMBLY_ERROR_MESSAGE: &str =
    "Error initializing warp context. Please check connection status and configs.";

/// 某个符号在某条链上的 token 及该链元数据
#[derive(Debug, Clone)]
pub struct TokenChainEntry {
    pub token: Arc<Token>,
    pub metadata: Arc<ChainMetadata>,
}

#[derive(Debug, Clone)]
pub struct TokenChainMap {
    /// 该符号第一次出现时的 token
    pub token_information: Arc<Token>,
    pub chains: BTreeMap<String, TokenChainEntry>,
}

/// 符号 -> 链 -> token
pub type TokensBySymbolChainMap = BTreeMap<String, TokenChainMap>;
/// 链 -> 该链上所有 token 的路由合约地址
pub type RouterAddressesByChainMap = BTreeMap<String, BTreeSet<String>>;

/// 一次装配的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStatus {
    Idle,
    Fetching,
    Committed,
    Reverted,
}

/// 一次装配发布的完整快照，发布后只读
#[derive(Debug, Clone)]
pub struct WarpSnapshot {
    /// 注册表中的原始链元数据（未叠加覆盖）
    pub chain_metadata: BTreeMap<String, ChainMetadata>,
    /// 绑定到叠加覆盖后元数据的 provider
    pub provider: MultiProtocolProvider,
    pub warp_core: WarpCore,
    pub tokens_by_symbol_chain_map: TokensBySymbolChainMap,
    pub router_addresses_by_chain_map: RouterAddressesByChainMap,
    /// 生成该快照时使用的覆盖（已过滤）
    pub chain_metadata_overrides: BTreeMap<String, Value>,
    pub warp_core_config_overrides: Vec<WarpCoreConfig>,
    pub assembled_at: DateTime<Utc>,
}

impl WarpSnapshot {
    /// 装配失败后的安全默认值：空 map、空 token 集合
    pub fn empty(
        chain_metadata_overrides: BTreeMap<String, Value>,
        warp_core_config_overrides: Vec<WarpCoreConfig>,
    ) -> Self {
        Self {
            chain_metadata: BTreeMap::new(),
            provider: MultiProtocolProvider::empty(),
            warp_core: WarpCore::empty(),
            tokens_by_symbol_chain_map: BTreeMap::new(),
            router_addresses_by_chain_map: BTreeMap::new(),
            chain_metadata_overrides,
            warp_core_config_overrides,
            assembled_at: Utc::now(),
        }
    }
}

/// 链元数据装配结果
#[derive(Debug, Clone)]
pub struct AssembledChainMetadata {
    pub chain_metadata: BTreeMap<String, ChainMetadata>,
    pub chain_metadata_with_overrides: BTreeMap<String, ChainMetadata>,
}

/// 去掉值为空（None 或假值）的覆盖项
pub fn filter_chain_metadata_overrides(overrides: ChainMetadataOverrides) -> BTreeMap<String, Value> {
    let total = overrides.len();
    let filtered = obj_filter(overrides);
    if filtered.len() < total {
        debug!("忽略 {} 项空覆盖", total - filtered.len());
    }
    filtered
}

/// 合并注册表路由与调用方覆盖
///
/// 覆盖追加在注册表之后；同一链上同一地址的 token 以后出现者为准，位置保持不变。
pub async fn assemble_warp_core_config(
    overrides: &[WarpCoreConfig],
    registry: &dyn Registry,
) -> WarpResult<WarpCoreConfig> {
    let routes = registry.get_warp_routes().await?;
    info!(
        "合并 {} 个注册表路由和 {} 个覆盖配置",
        routes.len(),
        overrides.len()
    );

    let mut merged = WarpCoreConfig::default();
    let mut index: HashMap<TokenId, usize> = HashMap::new();

    for config in routes.iter().chain(overrides.iter()) {
        for token in &config.tokens {
            let id = TokenId::new(token.standard.protocol(), &token.chain_name, &token.address_or_denom);
            match index.get(&id) {
                Some(&position) => merged.tokens[position] = token.clone(),
                None => {
                    index.insert(id, merged.tokens.len());
                    merged.tokens.push(token.clone());
                }
            }
        }
        if config.options.is_some() {
            merged.options = config.options.clone();
        }
    }

    merged.validate("merged warp core config")?;
    Ok(merged)
}

/// 获取链元数据并叠加覆盖
///
/// 只在覆盖中出现的链直接使用覆盖内容；两边都没有的链视为获取失败。
pub async fn assemble_chain_metadata(
    chains: &[String],
    registry: &dyn Registry,
    overrides: &BTreeMap<String, Value>,
) -> WarpResult<AssembledChainMetadata> {
    let mut all_chains: Vec<String> = chains.to_vec();
    for chain in overrides.keys() {
        if !all_chains.contains(chain) {
            all_chains.push(chain.clone());
        }
    }

    let fetched = try_join_all(all_chains.iter().map(|chain| async move {
        let value = registry.get_chain_metadata(chain).await?;
        Ok::<_, WarpError>((chain.clone(), value))
    }))
    .await?;

    let mut assembled = AssembledChainMetadata {
        chain_metadata: BTreeMap::new(),
        chain_metadata_with_overrides: BTreeMap::new(),
    };

    for (chain, base) in fetched {
        let merged = match (&base, overrides.get(&chain)) {
            (Some(base), Some(override_value)) => obj_merge(base, override_value),
            (Some(base), None) => base.clone(),
            (None, Some(override_value)) => {
                debug!("链 {} 不在注册表中，使用覆盖元数据", chain);
                override_value.clone()
            }
            (None, None) => {
                return Err(WarpError::ConfigFetch {
                    reason: format!("no metadata found for chain {}", chain),
                })
            }
        };

        if let Some(base) = base {
            assembled
                .chain_metadata
                .insert(chain.clone(), ChainMetadata::from_value(&chain, base)?);
        }
        assembled
            .chain_metadata_with_overrides
            .insert(chain.clone(), ChainMetadata::from_value(&chain, merged)?);
    }

    Ok(assembled)
}

/// 按链汇总所有 token 的路由合约地址，同链地址累加
pub fn router_addresses_by_chain(tokens: &[Arc<Token>]) -> RouterAddressesByChainMap {
    let mut map: RouterAddressesByChainMap = BTreeMap::new();
    for token in tokens {
        map.entry(token.chain_name().to_string())
            .or_default()
            .insert(token.address_or_denom().to_string());
    }
    map
}

/// 按符号、链建立 token 索引，缺少链元数据的 token 跳过
pub fn tokens_by_symbol_chain_map(
    tokens: &[Arc<Token>],
    provider: &MultiProtocolProvider,
) -> TokensBySymbolChainMap {
    let mut map: TokensBySymbolChainMap = BTreeMap::new();
    for token in tokens {
        let entry = map
            .entry(token.symbol().to_string())
            .or_insert_with(|| TokenChainMap {
                token_information: token.clone(),
                chains: BTreeMap::new(),
            });

        let Some(metadata) = provider.try_get_chain_metadata(token.chain_name()) else {
            warn!("链 {} 缺少元数据，跳过 token {}", token.chain_name(), token.symbol());
            continue;
        };
        entry.chains.insert(
            token.chain_name().to_string(),
            TokenChainEntry {
                token: token.clone(),
                metadata: metadata.clone(),
            },
        );
    }
    map
}

/// 调用方最近一次设置的两类覆盖，与已发布快照分开保存
#[derive(Debug, Clone, Default)]
struct RequestedOverrides {
    chain_metadata: BTreeMap<String, Value>,
    warp_core_config: Vec<WarpCoreConfig>,
}

/// 应用上下文：持有唯一的规范快照，只有装配操作会写入
pub struct WarpContext {
    registry: Arc<dyn Registry>,
    notifier: Arc<dyn Notifier>,
    rpc_timeout: Duration,
    state: RwLock<Arc<WarpSnapshot>>,
    status: Mutex<AssemblyStatus>,
    requested: Mutex<RequestedOverrides>,
}

impl WarpContext {
    pub fn new(registry: Arc<dyn Registry>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry,
            notifier,
            rpc_timeout: Duration::from_secs(30),
            state: RwLock::new(Arc::new(WarpSnapshot::empty(BTreeMap::new(), Vec::new()))),
            status: Mutex::new(AssemblyStatus::Idle),
            requested: Mutex::new(RequestedOverrides::default()),
        }
    }

    /// 根据配置创建：HTTP 注册表 + 日志提示
    pub fn from_config(config: &Config) -> WarpResult<Self> {
        let registry = HttpRegistry::new(&config.registry)?;
        Ok(Self::new(Arc::new(registry), Arc::new(LogNotifier))
            .with_rpc_timeout(Duration::from_secs(config.rpc.timeout_seconds)))
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// 当前发布的快照
    pub fn snapshot(&self) -> Arc<WarpSnapshot> {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn status(&self) -> AssemblyStatus {
        match self.status.lock() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// 首次装配，使用当前已设置的覆盖（初始为空）
    pub async fn initialize(&self) -> AssemblyStatus {
        let requested = self.update_requested(|_| {});
        self.assemble_and_publish(requested.chain_metadata, requested.warp_core_config)
            .await
    }

    /// 设置链元数据覆盖并重新装配
    ///
    /// 另一类覆盖取自最近一次设置的值，而不是已发布快照，
    /// 所以交错的两次调用都不会丢失对方的覆盖。并发装配以最后发布者为准。
    pub async fn set_chain_metadata_overrides(&self, overrides: ChainMetadataOverrides) -> AssemblyStatus {
        info!("设置链元数据覆盖，共 {} 项", overrides.len());
        let filtered = filter_chain_metadata_overrides(overrides);
        let requested = self.update_requested(|requested| requested.chain_metadata = filtered);
        self.assemble_and_publish(requested.chain_metadata, requested.warp_core_config)
            .await
    }

    /// 设置路由配置覆盖并重新装配，覆盖原样转交，不做过滤
    ///
    /// 链元数据覆盖取自最近一次设置的值；并发装配以最后发布者为准。
    pub async fn set_warp_core_config_overrides(&self, overrides: Vec<WarpCoreConfig>) -> AssemblyStatus {
        info!("设置路由配置覆盖，共 {} 项", overrides.len());
        let requested = self.update_requested(|requested| requested.warp_core_config = overrides);
        self.assemble_and_publish(requested.chain_metadata, requested.warp_core_config)
            .await
    }

    /// 在当前快照上解析转账路由
    pub fn resolve_transfer_route(
        &self,
        origin_token: &Arc<Token>,
        destination_token: &Token,
        allow_destination_collateral_fallback: bool,
    ) -> Option<ResolvedTransferRoute> {
        let snapshot = self.snapshot();
        RouteResolver::new(&snapshot.warp_core).resolve_transfer_route(
            origin_token,
            destination_token,
            allow_destination_collateral_fallback,
        )
    }

    async fn assemble_and_publish(
        &self,
        chain_overrides: BTreeMap<String, Value>,
        warp_overrides: Vec<WarpCoreConfig>,
    ) -> AssemblyStatus {
        self.set_status(AssemblyStatus::Fetching);
        info!("开始装配，注册表: {}", self.registry.uri());

        match self.assemble(&chain_overrides, &warp_overrides).await {
            Ok(snapshot) => {
                let (token_count, edge_count) = snapshot.warp_core.get_stats();
                info!(
                    "装配完成：{} 条链, {} 个 token, {} 条连接",
                    snapshot.provider.len(),
                    token_count,
                    edge_count
                );
                self.publish(snapshot);
                self.set_status(AssemblyStatus::Committed);
                AssemblyStatus::Committed
            }
            Err(e) => {
                error!("装配失败，重置为空状态: {}", e);
                self.notifier.error(ASSEMBLY_ERROR_MESSAGE);
                self.publish(WarpSnapshot::empty(chain_overrides, warp_overrides));
                self.set_status(AssemblyStatus::Reverted);
                AssemblyStatus::Reverted
            }
        }
    }

    async fn assemble(
        &self,
        chain_overrides: &BTreeMap<String, Value>,
        warp_overrides: &[WarpCoreConfig],
    ) -> WarpResult<WarpSnapshot> {
        let registry = self.registry.as_ref();

        let core_config = assemble_warp_core_config(warp_overrides, registry).await?;
        let chains = core_config.chain_names();
        let assembled = assemble_chain_metadata(&chains, registry, chain_overrides).await?;

        let provider = MultiProtocolProvider::new(assembled.chain_metadata_with_overrides)
            .with_rpc_timeout(self.rpc_timeout);
        let warp_core = WarpCore::from_config(provider.clone(), &core_config)?;

        let router_addresses_by_chain_map = router_addresses_by_chain(warp_core.tokens());
        let tokens_by_symbol_chain_map = tokens_by_symbol_chain_map(warp_core.tokens(), &provider);

        Ok(WarpSnapshot {
            chain_metadata: assembled.chain_metadata,
            provider,
            warp_core,
            tokens_by_symbol_chain_map,
            router_addresses_by_chain_map,
            chain_metadata_overrides: chain_overrides.clone(),
            warp_core_config_overrides: warp_overrides.to_vec(),
            assembled_at: Utc::now(),
        })
    }

    /// 在锁内修改覆盖并返回修改后的副本，锁不会跨越 await
    fn update_requested(&self, update: impl FnOnce(&mut RequestedOverrides)) -> RequestedOverrides {
        let mut requested = match self.requested.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        update(&mut *requested);
        requested.clone()
    }

    fn publish(&self, snapshot: WarpSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.state.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    fn set_status(&self, status: AssemblyStatus) {
        match self.status.lock() {
            Ok(mut current) => *current = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }
}
