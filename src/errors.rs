use thiserror::Error;

/// 库内统一错误类型
#[derive(Error, Debug)]
pub enum WarpError {
    /// 注册表或 RPC 请求失败（网络、超时、非 2xx 状态）
    #[error("Config fetch failed: {reason}")]
    ConfigFetch { reason: String },

    /// 获取到的文档结构不合法
    #[error("Schema validation failed for {document}: {reason}")]
    SchemaValidation { document: String, reason: String },

    /// 两个不同 token 的金额做加减
    #[error("Mismatched tokens: {left} vs {right}")]
    MismatchedToken { left: String, right: String },

    /// 该 token 标准不支持所请求的能力
    #[error("Adapter does not support {operation} for token standard {standard}")]
    AdapterUnsupported { operation: String, standard: String },

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Unknown chain: {chain}")]
    UnknownChain { chain: String },
}

pub type WarpResult<T> = std::result::Result<T, WarpError>;

impl From<reqwest::Error> for WarpError {
    fn from(e: reqwest::Error) -> Self {
        WarpError::ConfigFetch {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for WarpError {
    fn from(e: serde_json::Error) -> Self {
        WarpError::SchemaValidation {
            document: "json".to_string(),
            reason: e.to_string(),
        }
    }
}

impl WarpError {
    pub fn schema(document: impl Into<String>, reason: impl Into<String>) -> Self {
        WarpError::SchemaValidation {
            document: document.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>, standard: impl std::fmt::Display) -> Self {
        WarpError::AdapterUnsupported {
            operation: operation.into(),
            standard: standard.to_string(),
        }
    }
}
