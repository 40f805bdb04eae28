use async_trait::async_trait;
use ethers::types::U256;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::TokenAdapter;
use crate::core::types::{Token, TokenStandard};
use crate::errors::{WarpError, WarpResult};

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResult {
    value: u64,
}

/// Sealevel (Solana VM) token adapter backed by plain JSON-RPC.
///
/// Only lamport balances are read here; SPL account lookups stay unsupported.
pub struct SealevelTokenAdapter {
    client: Client,
    rpc_url: String,
    token: Arc<Token>,
}

impl SealevelTokenAdapter {
    pub fn new(rpc_url: String, timeout: Duration, token: Arc<Token>) -> WarpResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, rpc_url, token })
    }

    fn holds_lamports(&self) -> bool {
        matches!(
            self.token.standard(),
            TokenStandard::SealevelNative | TokenStandard::SealevelHypNative
        )
    }

    async fn rpc<T: for<'de> Deserialize<'de>>(&self, method: &str, params: serde_json::Value) -> WarpResult<T> {
        debug!("sealevel rpc {} -> {}", method, self.rpc_url);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse<T> = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(WarpError::ConfigFetch {
                reason: format!("{} failed ({}): {}", method, err.code, err.message),
            });
        }
        response.result.ok_or_else(|| WarpError::ConfigFetch {
            reason: format!("{} returned no result", method),
        })
    }
}

#[async_trait]
impl TokenAdapter for SealevelTokenAdapter {
    fn token(&self) -> &Token {
        &self.token
    }

    async fn get_balance(&self, address: &str) -> WarpResult<U256> {
        if !self.holds_lamports() {
            return Err(WarpError::unsupported("get_balance", self.token.standard()));
        }
        let balance: BalanceResult = self.rpc("getBalance", json!([address])).await?;
        Ok(U256::from(balance.value))
    }

    async fn is_approve_required(&self, _owner: &str, _amount: U256) -> WarpResult<bool> {
        // Sealevel transfers are signed by the owner directly
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ProtocolType;

    fn adapter(standard: TokenStandard) -> SealevelTokenAdapter {
        let token = Token::new(
            ProtocolType::Sealevel,
            "solanamainnet",
            "So11111111111111111111111111111111111111112",
            standard,
            "SOL",
            "Solana",
            9,
        )
        .unwrap();
        SealevelTokenAdapter::new(
            "http://127.0.0.1:8899".to_string(),
            Duration::from_secs(1),
            Arc::new(token),
        )
        .unwrap()
    }

    #[test]
    fn test_lamport_standards() {
        assert!(adapter(TokenStandard::SealevelNative).holds_lamports());
        assert!(adapter(TokenStandard::SealevelHypNative).holds_lamports());
        assert!(!adapter(TokenStandard::SealevelHypSynthetic).holds_lamports());
    }

    #[test]
    fn test_rpc_response_parsing() {
        let ok: RpcResponse<BalanceResult> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":5000}}"#).unwrap();
        assert_eq!(ok.result.unwrap().value, 5000);

        let err: RpcResponse<BalanceResult> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#)
                .unwrap();
        assert!(err.result.is_none());
        assert_eq!(err.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_collateral_balance_unsupported() {
        let adapter = adapter(TokenStandard::SealevelHypCollateral);
        assert!(matches!(
            adapter.get_balance("owner").await,
            Err(WarpError::AdapterUnsupported { .. })
        ));
        assert!(!adapter.is_approve_required("owner", U256::from(1u64)).await.unwrap());
    }
}
