use async_trait::async_trait;
use ethers::{
    abi::Abi,
    contract::Contract,
    providers::{Http, Middleware, Provider},
    types::{Address, U256},
};
use std::str::FromStr;
use std::sync::Arc;

use crate::adapters::{
    quote_with_commit_reveal_fallback, IntermediaryGasQuoter, InterchainGasQuote, TokenAdapter,
};
use crate::core::types::{Token, TokenStandard};
use crate::errors::{WarpError, WarpResult};

/// ERC20 最小 ABI
const ERC20_ABI: &str = r#"[
    {
        "constant": true,
        "inputs": [{"name": "owner", "type": "address"}],
        "name": "balanceOf",
        "outputs": [{"name": "", "type": "uint256"}],
        "type": "function"
    },
    {
        "constant": true,
        "inputs": [
            {"name": "owner", "type": "address"},
            {"name": "spender", "type": "address"}
        ],
        "name": "allowance",
        "outputs": [{"name": "", "type": "uint256"}],
        "type": "function"
    }
]"#;

/// Hyperlane 路由合约的 gas 报价 ABI
const ROUTER_ABI: &str = r#"[
    {
        "constant": true,
        "inputs": [{"name": "destinationDomain", "type": "uint32"}],
        "name": "quoteGasPayment",
        "outputs": [{"name": "", "type": "uint256"}],
        "type": "function"
    },
    {
        "constant": true,
        "inputs": [
            {"name": "destination", "type": "uint32"},
            {"name": "gasLimit", "type": "uint256"}
        ],
        "name": "quoteGasForCommitReveal",
        "outputs": [{"name": "", "type": "uint256"}],
        "type": "function"
    }
]"#;

/// commit-reveal 报价使用的目标链执行 gas 上限
const COMMIT_REVEAL_GAS_LIMIT: u64 = 200_000;

fn parse_abi(abi: &str) -> WarpResult<Abi> {
    serde_json::from_str(abi).map_err(|e| WarpError::schema("abi", e.to_string()))
}

fn parse_address(address: &str) -> WarpResult<Address> {
    Address::from_str(address).map_err(|e| WarpError::InvalidToken {
        reason: format!("invalid evm address {}: {}", address, e),
    })
}

fn call_error(method: &str, e: impl std::fmt::Display) -> WarpError {
    WarpError::ConfigFetch {
        reason: format!("{} call failed: {}", method, e),
    }
}

/// EVM 链上的 token 适配器
pub struct EvmTokenAdapter {
    provider: Arc<Provider<Http>>,
    token: Arc<Token>,
}

impl EvmTokenAdapter {
    pub fn new(provider: Arc<Provider<Http>>, token: Arc<Token>) -> Self {
        Self { provider, token }
    }

    /// 持有用户余额的 ERC20 合约：抵押型读抵押 token，其余读自身
    fn balance_contract_address(&self) -> &str {
        self.token
            .collateral_address_or_denom()
            .unwrap_or_else(|| self.token.address_or_denom())
    }

    fn is_native(&self) -> bool {
        matches!(
            self.token.standard(),
            TokenStandard::EvmNative | TokenStandard::EvmHypNative | TokenStandard::EvmHypNativeScaled
        )
    }

    fn requires_approval(&self) -> bool {
        matches!(
            self.token.standard(),
            TokenStandard::EvmHypCollateral
                | TokenStandard::EvmHypOwnerCollateral
                | TokenStandard::EvmHypRebaseCollateral
                | TokenStandard::EvmHypCollateralFiat
                | TokenStandard::EvmHypXerc20Lockbox
        )
    }

    fn erc20(&self, address: &str) -> WarpResult<Contract<Provider<Http>>> {
        Ok(Contract::new(
            parse_address(address)?,
            parse_abi(ERC20_ABI)?,
            self.provider.clone(),
        ))
    }
}

#[async_trait]
impl TokenAdapter for EvmTokenAdapter {
    fn token(&self) -> &Token {
        &self.token
    }

    async fn get_balance(&self, address: &str) -> WarpResult<U256> {
        let owner = parse_address(address)?;

        if self.is_native() {
            return self
                .provider
                .get_balance(owner, None)
                .await
                .map_err(|e| call_error("eth_getBalance", e));
        }

        let contract = self.erc20(self.balance_contract_address())?;
        contract
            .method::<_, U256>("balanceOf", owner)
            .map_err(|e| call_error("balanceOf", e))?
            .call()
            .await
            .map_err(|e| call_error("balanceOf", e))
    }

    async fn is_approve_required(&self, owner: &str, amount: U256) -> WarpResult<bool> {
        if !self.requires_approval() {
            return Ok(false);
        }

        let owner = parse_address(owner)?;
        let spender = parse_address(self.token.address_or_denom())?;
        let contract = self.erc20(self.balance_contract_address())?;
        let allowance = contract
            .method::<_, U256>("allowance", (owner, spender))
            .map_err(|e| call_error("allowance", e))?
            .call()
            .await
            .map_err(|e| call_error("allowance", e))?;
        Ok(allowance < amount)
    }

    async fn quote_transfer_remote_gas(&self, destination_domain: u32) -> WarpResult<InterchainGasQuote> {
        if !self.token.is_hyperlane_token() {
            return Err(WarpError::unsupported(
                "quote_transfer_remote_gas",
                self.token.standard(),
            ));
        }

        let router = EvmIntermediaryRouter::new(self.provider.clone(), self.token.address_or_denom())?;
        let amount = quote_with_commit_reveal_fallback(&router, destination_domain).await?;
        Ok(InterchainGasQuote {
            address_or_denom: None,
            amount,
        })
    }
}

/// 中间路由合约，可能只支持两种报价方式中的一种
pub struct EvmIntermediaryRouter {
    contract: Contract<Provider<Http>>,
}

impl EvmIntermediaryRouter {
    pub fn new(provider: Arc<Provider<Http>>, router_address: &str) -> WarpResult<Self> {
        Ok(Self {
            contract: Contract::new(parse_address(router_address)?, parse_abi(ROUTER_ABI)?, provider),
        })
    }
}

#[async_trait]
impl IntermediaryGasQuoter for EvmIntermediaryRouter {
    async fn quote_commit_reveal(&self, destination_domain: u32) -> WarpResult<U256> {
        self.contract
            .method::<_, U256>(
                "quoteGasForCommitReveal",
                (destination_domain, U256::from(COMMIT_REVEAL_GAS_LIMIT)),
            )
            .map_err(|e| call_error("quoteGasForCommitReveal", e))?
            .call()
            .await
            .map_err(|e| call_error("quoteGasForCommitReveal", e))
    }

    async fn quote_gas_payment(&self, destination_domain: u32) -> WarpResult<U256> {
        self.contract
            .method::<_, U256>("quoteGasPayment", destination_domain)
            .map_err(|e| call_error("quoteGasPayment", e))?
            .call()
            .await
            .map_err(|e| call_error("quoteGasPayment", e))
    }
}
