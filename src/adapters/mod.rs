pub mod cosmos;
pub mod evm;
pub mod sealevel;

use async_trait::async_trait;
use ethers::types::U256;
use log::debug;
use std::sync::Arc;

use crate::core::types::{ProtocolType, Token};
use crate::errors::{WarpError, WarpResult};
use crate::provider::MultiProtocolProvider;

pub use cosmos::CosmosTokenAdapter;
pub use evm::{EvmIntermediaryRouter, EvmTokenAdapter};
pub use sealevel::SealevelTokenAdapter;

/// 跨链 gas 报价
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterchainGasQuote {
    /// 支付 gas 所用的 token，`None` 表示原生 gas 资产
    pub address_or_denom: Option<String>,
    pub amount: U256,
}

/// 按协议实现的 token 能力接口
///
/// 每个实现只覆盖自身协议支持的操作，其余保持默认的 `AdapterUnsupported`。
#[async_trait]
pub trait TokenAdapter: Send + Sync {
    fn token(&self) -> &Token;

    /// 查询地址持有的余额（最小单位）
    async fn get_balance(&self, _address: &str) -> WarpResult<U256> {
        Err(WarpError::unsupported("get_balance", self.token().standard()))
    }

    /// 转出前是否需要先授权路由合约
    async fn is_approve_required(&self, _owner: &str, _amount: U256) -> WarpResult<bool> {
        Err(WarpError::unsupported("is_approve_required", self.token().standard()))
    }

    /// 跨链转账到目标 domain 需要支付的 gas
    async fn quote_transfer_remote_gas(&self, _destination_domain: u32) -> WarpResult<InterchainGasQuote> {
        Err(WarpError::unsupported("quote_transfer_remote_gas", self.token().standard()))
    }
}

/// 中间路由合约的两种 gas 报价接口
#[async_trait]
pub trait IntermediaryGasQuoter: Send + Sync {
    async fn quote_commit_reveal(&self, destination_domain: u32) -> WarpResult<U256>;

    async fn quote_gas_payment(&self, destination_domain: u32) -> WarpResult<U256>;
}

/// 先尝试 commit-reveal 报价，失败时改用通用 gas 报价
///
/// 这是合约兼容性处理，不是针对临时故障的重试。
pub async fn quote_with_commit_reveal_fallback(
    quoter: &dyn IntermediaryGasQuoter,
    destination_domain: u32,
) -> WarpResult<U256> {
    match quoter.quote_commit_reveal(destination_domain).await {
        Ok(amount) => Ok(amount),
        Err(e) => {
            debug!("commit-reveal 报价不可用 ({}), 改用 quoteGasPayment", e);
            quoter.quote_gas_payment(destination_domain).await
        }
    }
}

/// 按 token 的协议选择适配器
pub fn adapter_for(provider: &MultiProtocolProvider, token: Arc<Token>) -> WarpResult<Box<dyn TokenAdapter>> {
    let chain = token.chain_name().to_string();
    match token.protocol() {
        ProtocolType::Ethereum => {
            let evm_provider = provider.evm_provider(&chain)?;
            Ok(Box::new(EvmTokenAdapter::new(evm_provider, token)))
        }
        ProtocolType::Sealevel => {
            let rpc_url = provider.rpc_url(&chain)?.to_string();
            Ok(Box::new(SealevelTokenAdapter::new(rpc_url, provider.rpc_timeout(), token)?))
        }
        ProtocolType::Cosmos | ProtocolType::CosmosNative => {
            let rest_url = provider.rest_url(&chain)?.to_string();
            Ok(Box::new(CosmosTokenAdapter::new(rest_url, provider.rpc_timeout(), token)?))
        }
    }
}

/// 选择 Hyperlane 桥接适配器，非 Hyperlane 标准直接拒绝
pub fn hyp_adapter_for(provider: &MultiProtocolProvider, token: Arc<Token>) -> WarpResult<Box<dyn TokenAdapter>> {
    if !token.is_hyperlane_token() {
        return Err(WarpError::unsupported("hyperlane adapter", token.standard()));
    }
    adapter_for(provider, token)
}
