use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// 默认注册表地址
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.hyperlane.xyz";
pub const DEFAULT_REGISTRY_BRANCH: &str = "main";

/// 配置文件名（不含扩展名），位于工作目录
const CONFIG_FILE: &str = "warp-route";
/// 环境变量前缀，例如 WARP_REGISTRY__BRANCH
const ENV_PREFIX: &str = "WARP";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub registry: RegistryConfig,
    pub transfer: TransferConfig,
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub url: String,
    pub branch: String,
    pub proxy: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// 允许目标链上的其他表示（相同抵押资产）作为路由终点
    pub allow_destination_collateral_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig {
                url: DEFAULT_REGISTRY_URL.to_string(),
                branch: DEFAULT_REGISTRY_BRANCH.to_string(),
                proxy: None,
                timeout_seconds: 30,
            },
            transfer: TransferConfig {
                allow_destination_collateral_fallback: false,
            },
            rpc: RpcConfig { timeout_seconds: 30 },
        }
    }
}

impl Config {
    /// 加载配置：默认值 -> warp-route.toml（可选）-> WARP_ 环境变量
    pub fn load() -> Result<Self> {
        let defaults = Config::default();

        let settings = config::Config::builder()
            .set_default("registry.url", defaults.registry.url)?
            .set_default("registry.branch", defaults.registry.branch)?
            .set_default("registry.timeout_seconds", defaults.registry.timeout_seconds)?
            .set_default(
                "transfer.allow_destination_collateral_fallback",
                defaults.transfer.allow_destination_collateral_fallback,
            )?
            .set_default("rpc.timeout_seconds", defaults.rpc.timeout_seconds)?
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置项
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.registry.url)
            .map_err(|e| anyhow!("无效的注册表地址 {}: {}", self.registry.url, e))?;

        if self.registry.branch.trim().is_empty() {
            return Err(anyhow!("注册表分支不能为空"));
        }
        if let Some(ref proxy) = self.registry.proxy {
            url::Url::parse(proxy).map_err(|e| anyhow!("无效的代理地址 {}: {}", proxy, e))?;
        }
        if self.registry.timeout_seconds == 0 || self.rpc.timeout_seconds == 0 {
            return Err(anyhow!("超时时间必须大于 0"));
        }
        Ok(())
    }
}
