use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{WarpError, WarpResult};
use crate::utils::{addresses_equal, normalize_address};

/// 链所使用的执行协议
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    Ethereum,
    Sealevel,
    Cosmos,
    #[serde(rename = "cosmosnative")]
    CosmosNative,
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolType::Ethereum => "ethereum",
            ProtocolType::Sealevel => "sealevel",
            ProtocolType::Cosmos => "cosmos",
            ProtocolType::CosmosNative => "cosmosnative",
        };
        f.write_str(name)
    }
}

impl FromStr for ProtocolType {
    type Err = WarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" => Ok(ProtocolType::Ethereum),
            "sealevel" => Ok(ProtocolType::Sealevel),
            "cosmos" => Ok(ProtocolType::Cosmos),
            "cosmosnative" => Ok(ProtocolType::CosmosNative),
            other => Err(WarpError::InvalidToken {
                reason: format!("unknown protocol {}", other),
            }),
        }
    }
}

/// Token 标准标签，序列化名称与注册表文档保持一致
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TokenStandard {
    // EVM
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
    EvmNative,
    EvmHypNative,
    EvmHypNativeScaled,
    EvmHypCollateral,
    EvmHypOwnerCollateral,
    EvmHypRebaseCollateral,
    EvmHypCollateralFiat,
    EvmHypSynthetic,
    EvmHypSyntheticRebase,
    #[serde(rename = "EvmHypXERC20")]
    EvmHypXerc20,
    #[serde(rename = "EvmHypXERC20Lockbox")]
    EvmHypXerc20Lockbox,
    EvmKhalaniIntent,
    // Sealevel
    SealevelSpl,
    SealevelSpl2022,
    SealevelNative,
    SealevelHypNative,
    SealevelHypCollateral,
    SealevelHypSynthetic,
    // Cosmos
    #[serde(rename = "CW20")]
    Cw20,
    CwNative,
    CwHypNative,
    CwHypCollateral,
    CwHypSynthetic,
    CosmosIcs20,
    CosmosNative,
    CosmosIbc,
    CosmNativeHypCollateral,
    CosmNativeHypSynthetic,
}

impl TokenStandard {
    /// 由链上原生 gas 资产背书、没有显式抵押地址的 Hyperlane 表示
    pub fn is_hyp_native(&self) -> bool {
        matches!(
            self,
            TokenStandard::EvmHypNative
                | TokenStandard::EvmHypNativeScaled
                | TokenStandard::SealevelHypNative
                | TokenStandard::CwHypNative
        )
    }

    /// 是否为 Hyperlane 桥接合约（可构造跨链转账）
    pub fn is_hyperlane(&self) -> bool {
        matches!(
            self,
            TokenStandard::EvmHypNative
                | TokenStandard::EvmHypNativeScaled
                | TokenStandard::EvmHypCollateral
                | TokenStandard::EvmHypOwnerCollateral
                | TokenStandard::EvmHypRebaseCollateral
                | TokenStandard::EvmHypCollateralFiat
                | TokenStandard::EvmHypSynthetic
                | TokenStandard::EvmHypSyntheticRebase
                | TokenStandard::EvmHypXerc20
                | TokenStandard::EvmHypXerc20Lockbox
                | TokenStandard::SealevelHypNative
                | TokenStandard::SealevelHypCollateral
                | TokenStandard::SealevelHypSynthetic
                | TokenStandard::CwHypNative
                | TokenStandard::CwHypCollateral
                | TokenStandard::CwHypSynthetic
                | TokenStandard::CosmNativeHypCollateral
                | TokenStandard::CosmNativeHypSynthetic
        )
    }

    pub fn is_intent(&self) -> bool {
        matches!(self, TokenStandard::EvmKhalaniIntent)
    }

    /// 该标准所属的协议
    pub fn protocol(&self) -> ProtocolType {
        use TokenStandard::*;
        match self {
            Erc20 | Erc721 | EvmNative | EvmHypNative | EvmHypNativeScaled | EvmHypCollateral
            | EvmHypOwnerCollateral | EvmHypRebaseCollateral | EvmHypCollateralFiat
            | EvmHypSynthetic | EvmHypSyntheticRebase | EvmHypXerc20 | EvmHypXerc20Lockbox
            | EvmKhalaniIntent => ProtocolType::Ethereum,
            SealevelSpl | SealevelSpl2022 | SealevelNative | SealevelHypNative
            | SealevelHypCollateral | SealevelHypSynthetic => ProtocolType::Sealevel,
            Cw20 | CwNative | CwHypNative | CwHypCollateral | CwHypSynthetic | CosmosIcs20
            | CosmosNative | CosmosIbc => ProtocolType::Cosmos,
            CosmNativeHypCollateral | CosmNativeHypSynthetic => ProtocolType::CosmosNative,
        }
    }
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => f.write_str(&s),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Token 的身份：协议 + 链 + 规范化后的地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId {
    pub protocol: ProtocolType,
    pub chain_name: String,
    pub address: String,
}

impl TokenId {
    pub fn new(protocol: ProtocolType, chain_name: &str, address: &str) -> Self {
        Self {
            protocol,
            chain_name: chain_name.to_string(),
            address: normalize_address(protocol, address),
        }
    }

    /// 解析 `protocol|chain|address` 形式的连接字符串
    pub fn parse(connection: &str) -> WarpResult<Self> {
        let parts: Vec<&str> = connection.split('|').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(WarpError::schema(
                "token connection",
                format!("expected protocol|chain|address, got {}", connection),
            ));
        }
        let protocol = ProtocolType::from_str(parts[0])?;
        Ok(Self::new(protocol, parts[1], parts[2]))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.protocol, self.chain_name, self.address)
    }
}

/// 某条链上的一个 token 表示，构造后不可变
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    protocol: ProtocolType,
    chain_name: String,
    address_or_denom: String,
    collateral_address_or_denom: Option<String>,
    standard: TokenStandard,
    symbol: String,
    name: String,
    decimals: u8,
    logo_uri: Option<String>,
}

impl Token {
    pub fn new(
        protocol: ProtocolType,
        chain_name: &str,
        address_or_denom: &str,
        standard: TokenStandard,
        symbol: &str,
        name: &str,
        decimals: u8,
    ) -> WarpResult<Self> {
        if chain_name.trim().is_empty() {
            return Err(WarpError::InvalidToken {
                reason: "chain name cannot be empty".to_string(),
            });
        }
        if address_or_denom.trim().is_empty() {
            return Err(WarpError::InvalidToken {
                reason: format!("address or denom cannot be empty on {}", chain_name),
            });
        }

        Ok(Self {
            protocol,
            chain_name: chain_name.to_string(),
            address_or_denom: address_or_denom.to_string(),
            collateral_address_or_denom: None,
            standard,
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            logo_uri: None,
        })
    }

    /// 设置抵押资产地址；空字符串视为未设置
    pub fn with_collateral(mut self, collateral: Option<&str>) -> Self {
        self.collateral_address_or_denom = collateral
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_logo_uri(mut self, logo_uri: Option<String>) -> Self {
        self.logo_uri = logo_uri;
        self
    }

    pub fn protocol(&self) -> ProtocolType {
        self.protocol
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    pub fn address_or_denom(&self) -> &str {
        &self.address_or_denom
    }

    pub fn collateral_address_or_denom(&self) -> Option<&str> {
        self.collateral_address_or_denom.as_deref()
    }

    pub fn standard(&self) -> TokenStandard {
        self.standard
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn logo_uri(&self) -> Option<&str> {
        self.logo_uri.as_deref()
    }

    pub fn id(&self) -> TokenId {
        TokenId::new(self.protocol, &self.chain_name, &self.address_or_denom)
    }

    pub fn is_hyp_native(&self) -> bool {
        self.standard.is_hyp_native()
    }

    pub fn is_hyperlane_token(&self) -> bool {
        self.standard.is_hyperlane()
    }

    /// 同协议、同链、同地址即为同一个 token
    pub fn equals(&self, other: &Token) -> bool {
        self.protocol == other.protocol
            && self.chain_name == other.chain_name
            && addresses_equal(self.protocol, &self.address_or_denom, &other.address_or_denom)
    }

    /// 规范化后的抵押地址
    pub fn normalized_collateral(&self) -> Option<String> {
        self.collateral_address_or_denom
            .as_deref()
            .map(|c| normalize_address(self.protocol, c))
            .filter(|c| !c.is_empty())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.id())
    }
}

/// 一次转账应使用的 token 对，每次转账意图重新计算
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransferRoute {
    pub origin_token: Arc<Token>,
    pub destination_token: Arc<Token>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc(chain: &str, address: &str) -> Token {
        Token::new(
            ProtocolType::Ethereum,
            chain,
            address,
            TokenStandard::EvmHypCollateral,
            "USDC",
            "USD Coin",
            6,
        )
        .unwrap()
    }

    #[test]
    fn test_token_requires_identity_fields() {
        let result = Token::new(
            ProtocolType::Ethereum,
            "",
            "0x1",
            TokenStandard::Erc20,
            "X",
            "X",
            18,
        );
        assert!(matches!(result, Err(WarpError::InvalidToken { .. })));

        let result = Token::new(
            ProtocolType::Ethereum,
            "ethereum",
            "  ",
            TokenStandard::Erc20,
            "X",
            "X",
            18,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_token_equality_is_address_normalized() {
        let a = usdc("ethereum", "0xABCDEF");
        let b = usdc("ethereum", "0xabcdef");
        let c = usdc("arbitrum", "0xabcdef");
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_token_id_parse() {
        let id = TokenId::parse("ethereum|arbitrum|0xAbC").unwrap();
        assert_eq!(id.protocol, ProtocolType::Ethereum);
        assert_eq!(id.chain_name, "arbitrum");
        assert_eq!(id.address, "0xabc");
        assert_eq!(id.to_string(), "ethereum|arbitrum|0xabc");

        assert!(TokenId::parse("ethereum|arbitrum").is_err());
        assert!(TokenId::parse("bitcoin|main|abc").is_err());
    }

    #[test]
    fn test_standard_serialization() {
        let json = serde_json::to_string(&TokenStandard::EvmHypXerc20).unwrap();
        assert_eq!(json, "\"EvmHypXERC20\"");
        let parsed: TokenStandard = serde_json::from_str("\"SealevelHypNative\"").unwrap();
        assert!(parsed.is_hyp_native());
        assert_eq!(parsed.protocol(), ProtocolType::Sealevel);
        assert_eq!(TokenStandard::Cw20.to_string(), "CW20");
    }

    #[test]
    fn test_empty_collateral_is_unset() {
        let token = usdc("ethereum", "0x1").with_collateral(Some(""));
        assert_eq!(token.collateral_address_or_denom(), None);
        assert_eq!(token.normalized_collateral(), None);
    }
}
