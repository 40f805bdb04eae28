use bigdecimal::BigDecimal;
use ethers::types::U256;
use num_traits::Zero;
use std::fmt;
use std::sync::Arc;

use crate::core::types::Token;
use crate::errors::{WarpError, WarpResult};
use crate::utils::{from_wei, to_wei};

/// Token 与其最小单位数量的组合，所有运算都返回新实例
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    token: Arc<Token>,
    amount: U256,
}

impl TokenAmount {
    pub fn new(token: Arc<Token>, amount: U256) -> Self {
        Self { token, amount }
    }

    /// 从十进制字符串构造（最小单位），拒绝负数和非整数
    pub fn from_wei_str(token: Arc<Token>, wei: &str) -> WarpResult<Self> {
        let wei = wei.trim();
        if wei.starts_with('-') {
            return Err(WarpError::InvalidAmount {
                reason: format!("amount must be non-negative, got {}", wei),
            });
        }
        let amount = U256::from_dec_str(wei).map_err(|e| WarpError::InvalidAmount {
            reason: format!("{}: {}", wei, e),
        })?;
        Ok(Self::new(token, amount))
    }

    /// 从可读数量构造，按 token 精度换算并截断多余小数位
    pub fn from_decimal(token: Arc<Token>, amount: &BigDecimal) -> WarpResult<Self> {
        if *amount < BigDecimal::zero() {
            return Err(WarpError::InvalidAmount {
                reason: format!("amount must be non-negative, got {}", amount),
            });
        }
        let wei = to_wei(amount, token.decimals()).map_err(|e| WarpError::InvalidAmount {
            reason: e.to_string(),
        })?;
        Self::from_wei_str(token, &wei)
    }

    pub fn token(&self) -> &Arc<Token> {
        &self.token
    }

    pub fn get_wei(&self) -> U256 {
        self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// 换算为可读数量
    pub fn get_decimal_formatted_amount(&self) -> BigDecimal {
        from_wei(&self.amount.to_string(), self.token.decimals()).unwrap_or_default()
    }

    pub fn plus(&self, other: &TokenAmount) -> WarpResult<TokenAmount> {
        self.ensure_same_token(other)?;
        self.plus_wei(other.amount)
    }

    pub fn minus(&self, other: &TokenAmount) -> WarpResult<TokenAmount> {
        self.ensure_same_token(other)?;
        self.minus_wei(other.amount)
    }

    pub fn plus_wei(&self, wei: U256) -> WarpResult<TokenAmount> {
        let amount = self
            .amount
            .checked_add(wei)
            .ok_or_else(|| WarpError::InvalidAmount {
                reason: "amount overflow".to_string(),
            })?;
        Ok(Self::new(self.token.clone(), amount))
    }

    pub fn minus_wei(&self, wei: U256) -> WarpResult<TokenAmount> {
        let amount = self
            .amount
            .checked_sub(wei)
            .ok_or_else(|| WarpError::InvalidAmount {
                reason: format!("{} minus {} would be negative", self.amount, wei),
            })?;
        Ok(Self::new(self.token.clone(), amount))
    }

    /// 同一 token 且数量相等
    pub fn equals(&self, other: &TokenAmount) -> bool {
        self.token.equals(&other.token) && self.amount == other.amount
    }

    fn ensure_same_token(&self, other: &TokenAmount) -> WarpResult<()> {
        if self.token.equals(&other.token) {
            Ok(())
        } else {
            Err(WarpError::MismatchedToken {
                left: self.token.id().to_string(),
                right: other.token.id().to_string(),
            })
        }
    }
}

impl Token {
    /// 以最小单位数量构造该 token 的金额
    pub fn amount(self: &Arc<Self>, wei: U256) -> TokenAmount {
        TokenAmount::new(self.clone(), wei)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.get_decimal_formatted_amount(),
            self.token.symbol()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ProtocolType, TokenStandard};
    use std::str::FromStr;

    fn token(chain: &str, address: &str) -> Arc<Token> {
        Arc::new(
            Token::new(
                ProtocolType::Ethereum,
                chain,
                address,
                TokenStandard::EvmHypSynthetic,
                "USDC",
                "USD Coin",
                6,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_wei_round_trip() {
        let t = token("ethereum", "0x1");
        let wei = U256::from(123_456_789u64);
        assert_eq!(t.amount(wei).get_wei(), wei);
        assert!(t.amount(U256::zero()).is_zero());
    }

    #[test]
    fn test_plus_minus_inverse() {
        let t = token("ethereum", "0x1");
        let a = TokenAmount::new(t, U256::from(1_000u64));
        let w = U256::from(250u64);
        let back = a.plus_wei(w).unwrap().minus_wei(w).unwrap();
        assert_eq!(back.get_wei(), a.get_wei());
        // 原实例不变
        assert_eq!(a.get_wei(), U256::from(1_000u64));
    }

    #[test]
    fn test_mismatched_tokens() {
        let a = TokenAmount::new(token("ethereum", "0x1"), U256::from(1u64));
        let b = TokenAmount::new(token("arbitrum", "0x1"), U256::from(1u64));
        assert!(matches!(a.plus(&b), Err(WarpError::MismatchedToken { .. })));
        assert!(matches!(a.minus(&b), Err(WarpError::MismatchedToken { .. })));

        // 地址大小写不同仍是同一 token
        let c = TokenAmount::new(token("ethereum", "0xAB"), U256::from(2u64));
        let d = TokenAmount::new(token("ethereum", "0xab"), U256::from(3u64));
        assert_eq!(c.plus(&d).unwrap().get_wei(), U256::from(5u64));
    }

    #[test]
    fn test_minus_below_zero_rejected() {
        let a = TokenAmount::new(token("ethereum", "0x1"), U256::from(1u64));
        assert!(matches!(
            a.minus_wei(U256::from(2u64)),
            Err(WarpError::InvalidAmount { .. })
        ));
        assert!(TokenAmount::from_wei_str(token("ethereum", "0x1"), "-5").is_err());
    }

    #[test]
    fn test_decimal_conversion() {
        let t = token("ethereum", "0x1");
        let amount = TokenAmount::from_decimal(t, &BigDecimal::from_str("12.5").unwrap()).unwrap();
        assert_eq!(amount.get_wei(), U256::from(12_500_000u64));
        assert_eq!(
            amount.get_decimal_formatted_amount(),
            BigDecimal::from_str("12.5").unwrap()
        );
        let display = amount.to_string();
        assert!(display.starts_with("12.5"));
        assert!(display.ends_with(" USDC"));
    }
}
