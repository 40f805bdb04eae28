use async_trait::async_trait;
use ethers::types::U256;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::TokenAdapter;
use crate::core::types::{Token, TokenStandard};
use crate::errors::{WarpError, WarpResult};

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Coin,
}

#[derive(Debug, Deserialize)]
struct Coin {
    #[allow(dead_code)]
    denom: String,
    amount: String,
}

/// Cosmos token adapter backed by the bank module REST API.
pub struct CosmosTokenAdapter {
    client: Client,
    rest_url: String,
    token: Arc<Token>,
}

impl CosmosTokenAdapter {
    pub fn new(rest_url: String, timeout: Duration, token: Arc<Token>) -> WarpResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rest_url: rest_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Bank denom holding user funds; `None` for contract-held balances.
    fn bank_denom(&self) -> Option<&str> {
        match self.token.standard() {
            TokenStandard::Cw20 => None,
            TokenStandard::CwHypCollateral
            | TokenStandard::CwHypNative
            | TokenStandard::CosmNativeHypCollateral => Some(
                self.token
                    .collateral_address_or_denom()
                    .unwrap_or_else(|| self.token.address_or_denom()),
            ),
            _ => Some(self.token.address_or_denom()),
        }
    }

    fn balance_url(&self, address: &str, denom: &str) -> WarpResult<url::Url> {
        let invalid = |reason: String| WarpError::ConfigFetch {
            reason: format!("invalid rest url {}: {}", self.rest_url, reason),
        };
        let mut url = url::Url::parse(&self.rest_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["cosmos", "bank", "v1beta1", "balances"])
            .push(address)
            .push("by_denom");
        url.query_pairs_mut().append_pair("denom", denom);
        Ok(url)
    }
}

#[async_trait]
impl TokenAdapter for CosmosTokenAdapter {
    fn token(&self) -> &Token {
        &self.token
    }

    async fn get_balance(&self, address: &str) -> WarpResult<U256> {
        let denom = self
            .bank_denom()
            .ok_or_else(|| WarpError::unsupported("get_balance", self.token.standard()))?;
        let url = self.balance_url(address, denom)?;
        debug!("cosmos balance query: {}", url);

        let response: BalanceResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        U256::from_dec_str(&response.balance.amount).map_err(|e| WarpError::InvalidAmount {
            reason: format!("bank balance {}: {}", response.balance.amount, e),
        })
    }

    async fn is_approve_required(&self, _owner: &str, _amount: U256) -> WarpResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ProtocolType;

    fn adapter(standard: TokenStandard, collateral: Option<&str>) -> CosmosTokenAdapter {
        let token = Token::new(
            ProtocolType::Cosmos,
            "neutron",
            "neutron1router",
            standard,
            "NTRN",
            "Neutron",
            6,
        )
        .unwrap()
        .with_collateral(collateral);
        CosmosTokenAdapter::new(
            "https://rest.neutron.example.com/".to_string(),
            Duration::from_secs(1),
            Arc::new(token),
        )
        .unwrap()
    }

    #[test]
    fn test_bank_denom_selection() {
        assert_eq!(
            adapter(TokenStandard::CwHypCollateral, Some("untrn")).bank_denom(),
            Some("untrn")
        );
        assert_eq!(
            adapter(TokenStandard::CosmosIbc, None).bank_denom(),
            Some("neutron1router")
        );
        assert_eq!(adapter(TokenStandard::Cw20, None).bank_denom(), None);
    }

    #[test]
    fn test_balance_url_escapes_denom() {
        let adapter = adapter(TokenStandard::CosmosIbc, None);
        let url = adapter.balance_url("neutron1owner", "ibc/ABC").unwrap();
        assert_eq!(
            url.as_str(),
            "https://rest.neutron.example.com/cosmos/bank/v1beta1/balances/neutron1owner/by_denom?denom=ibc%2FABC"
        );
    }

    #[test]
    fn test_balance_url_escapes_owner() {
        let adapter = adapter(TokenStandard::CosmosIbc, None);
        let url = adapter.balance_url("owner/../../admin?x=1", "untrn").unwrap();
        assert_eq!(
            url.path(),
            "/cosmos/bank/v1beta1/balances/owner%2F..%2F..%2Fadmin%3Fx=1/by_denom"
        );
        assert_eq!(url.query(), Some("denom=untrn"));
    }

    #[test]
    fn test_balance_response_parsing() {
        let parsed: BalanceResponse =
            serde_json::from_str(r#"{"balance":{"denom":"untrn","amount":"123456"}}"#).unwrap();
        assert_eq!(parsed.balance.amount, "123456");
    }
}
