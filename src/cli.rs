use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{info, warn};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

use crate::assembler::{AssemblyStatus, WarpContext, WarpSnapshot};
use crate::config::Config;
use crate::core::types::Token;
use crate::notify::LogNotifier;
use crate::registry::StaticRegistry;
use crate::warp_config::OverridesFile;

// 命令行参数常量
const CHAINS_ARG: &str = "chains";
const TOKENS_ARG: &str = "tokens";
const RESOLVE_ARG: &str = "resolve";
const ORIGIN_ARG: &str = "origin";
const DESTINATION_ARG: &str = "destination";
const FALLBACK_ARG: &str = "fallback";
const OVERRIDES_ARG: &str = "overrides";
const REGISTRY_FILE_ARG: &str = "registry-file";

#[derive(Tabled)]
struct ChainRow {
    #[tabled(rename = "链")]
    name: String,
    #[tabled(rename = "名称")]
    display_name: String,
    #[tabled(rename = "协议")]
    protocol: String,
    #[tabled(rename = "Domain")]
    domain_id: u32,
    #[tabled(rename = "RPC")]
    rpc: String,
}

#[derive(Tabled)]
struct TokenRow {
    #[tabled(rename = "符号")]
    symbol: String,
    #[tabled(rename = "链")]
    chain: String,
    #[tabled(rename = "标准")]
    standard: String,
    #[tabled(rename = "地址")]
    address: String,
    #[tabled(rename = "连接")]
    connections: usize,
    #[tabled(rename = "可达链")]
    destinations: String,
}

/// CLI应用程序结构
pub struct CliApp {
    config: Config,
    context: WarpContext,
}

impl CliApp {
    /// 创建新的CLI应用程序实例
    pub fn new(matches: &ArgMatches) -> Result<Self> {
        let config = Config::load()?;
        info!("配置加载完成，注册表: {}", config.registry.url);

        let context = match matches.get_one::<String>(REGISTRY_FILE_ARG) {
            Some(path) => {
                info!("使用本地注册表文件 {}", path);
                let registry = StaticRegistry::from_file(path)?;
                WarpContext::new(Arc::new(registry), Arc::new(LogNotifier))
                    .with_rpc_timeout(Duration::from_secs(config.rpc.timeout_seconds))
            }
            None => WarpContext::from_config(&config)?,
        };

        Ok(Self { config, context })
    }

    /// 构建命令行参数解析器
    pub fn build_cli() -> Command {
        Command::new("warp-route")
            .version("0.1.0")
            .about("跨链 warp 路由查询工具")
            .arg(
                Arg::new(CHAINS_ARG)
                    .long(CHAINS_ARG)
                    .help("列出装配后的链元数据")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(TOKENS_ARG)
                    .long(TOKENS_ARG)
                    .help("列出所有 token 及其连接数")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(RESOLVE_ARG)
                    .long(RESOLVE_ARG)
                    .short('r')
                    .help("解析一次转账的路由")
                    .action(ArgAction::SetTrue)
                    .requires(ORIGIN_ARG)
                    .requires(DESTINATION_ARG),
            )
            .arg(
                Arg::new(ORIGIN_ARG)
                    .long(ORIGIN_ARG)
                    .help("起点 token，格式 chain:address")
                    .value_name("CHAIN:ADDRESS")
                    .requires(RESOLVE_ARG),
            )
            .arg(
                Arg::new(DESTINATION_ARG)
                    .long(DESTINATION_ARG)
                    .help("终点 token，格式 chain:address")
                    .value_name("CHAIN:ADDRESS")
                    .requires(RESOLVE_ARG),
            )
            .arg(
                Arg::new(FALLBACK_ARG)
                    .long(FALLBACK_ARG)
                    .help("允许终点使用相同抵押资产的其他表示")
                    .action(ArgAction::SetTrue)
                    .requires(RESOLVE_ARG),
            )
            .arg(
                Arg::new(OVERRIDES_ARG)
                    .long(OVERRIDES_ARG)
                    .help("覆盖配置文件 (JSON)")
                    .value_name("FILE"),
            )
            .arg(
                Arg::new(REGISTRY_FILE_ARG)
                    .long(REGISTRY_FILE_ARG)
                    .help("使用本地注册表文件代替 HTTP 注册表")
                    .value_name("FILE"),
            )
    }

    /// 运行CLI应用程序
    pub async fn run(&self, matches: ArgMatches) -> Result<()> {
        let status = self.assemble(matches.get_one::<String>(OVERRIDES_ARG)).await?;
        if status == AssemblyStatus::Reverted {
            return Err(anyhow!("装配失败，请检查注册表连接和覆盖配置"));
        }

        let snapshot = self.context.snapshot();

        if matches.get_flag(CHAINS_ARG) {
            print_chains(&snapshot);
        }

        if matches.get_flag(TOKENS_ARG) {
            print_tokens(&snapshot);
        }

        if matches.get_flag(RESOLVE_ARG) {
            let origin = required(&matches, ORIGIN_ARG)?;
            let destination = required(&matches, DESTINATION_ARG)?;
            let fallback = matches.get_flag(FALLBACK_ARG)
                || self.config.transfer.allow_destination_collateral_fallback;
            self.resolve(&snapshot, origin, destination, fallback)?;
        }

        if !matches.get_flag(CHAINS_ARG) && !matches.get_flag(TOKENS_ARG) && !matches.get_flag(RESOLVE_ARG) {
            let (tokens, connections) = snapshot.warp_core.get_stats();
            println!(
                "已装配 {} 条链, {} 个 token, {} 条连接",
                snapshot.provider.len(),
                tokens,
                connections
            );
        }

        Ok(())
    }

    /// 读取覆盖文件并装配；先设路由覆盖，再设链覆盖，后者会沿用前者
    async fn assemble(&self, overrides_path: Option<&String>) -> Result<AssemblyStatus> {
        let Some(path) = overrides_path else {
            return Ok(self.context.initialize().await);
        };

        let content = fs::read_to_string(path).with_context(|| format!("无法读取覆盖文件 {}", path))?;
        let overrides: OverridesFile =
            serde_json::from_str(&content).with_context(|| format!("覆盖文件格式错误 {}", path))?;
        info!(
            "加载覆盖: {} 条链, {} 个路由配置",
            overrides.chain_metadata_overrides.len(),
            overrides.warp_core_config_overrides.len()
        );

        let mut status = self
            .context
            .set_warp_core_config_overrides(overrides.warp_core_config_overrides)
            .await;
        if !overrides.chain_metadata_overrides.is_empty() {
            status = self
                .context
                .set_chain_metadata_overrides(overrides.chain_metadata_overrides)
                .await;
        }
        Ok(status)
    }

    fn resolve(&self, snapshot: &WarpSnapshot, origin: &str, destination: &str, fallback: bool) -> Result<()> {
        let origin = lookup_token(snapshot, origin)?;
        let destination = lookup_token(snapshot, destination)?;

        match self.context.resolve_transfer_route(&origin, &destination, fallback) {
            Some(route) => {
                println!("起点: {}", route.origin_token);
                println!("终点: {}", route.destination_token);
            }
            None => {
                warn!("{} -> {} 没有可用路由", origin, destination);
                println!("没有可用路由");
            }
        }
        Ok(())
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("缺少参数 --{}", name))
}

/// 解析 `chain:address` 形式的 token 引用
fn parse_token_ref(value: &str) -> Result<(&str, &str)> {
    match value.split_once(':') {
        Some((chain, address)) if !chain.is_empty() && !address.is_empty() => Ok((chain, address)),
        _ => Err(anyhow!("无效的 token 引用 {}，应为 chain:address", value)),
    }
}

fn lookup_token(snapshot: &WarpSnapshot, value: &str) -> Result<Arc<Token>> {
    let (chain, address) = parse_token_ref(value)?;
    snapshot
        .warp_core
        .find_token(chain, address)
        .cloned()
        .ok_or_else(|| anyhow!("未找到 token {}", value))
}

fn print_chains(snapshot: &WarpSnapshot) {
    let rows: Vec<ChainRow> = snapshot
        .provider
        .chain_names()
        .into_iter()
        .filter_map(|chain| {
            let metadata = snapshot.provider.try_get_chain_metadata(&chain)?;
            Some(ChainRow {
                name: chain.clone(),
                display_name: metadata.display_name().to_string(),
                protocol: metadata.protocol.to_string(),
                domain_id: metadata.domain_id,
                rpc: metadata
                    .rpc_urls
                    .first()
                    .map(|rpc| rpc.http.clone())
                    .unwrap_or_default(),
            })
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn token_rows(snapshot: &WarpSnapshot) -> Vec<TokenRow> {
    let core = &snapshot.warp_core;
    core.tokens()
        .iter()
        .map(|token| TokenRow {
            symbol: token.symbol().to_string(),
            chain: token.chain_name().to_string(),
            standard: token.standard().to_string(),
            address: token.address_or_denom().to_string(),
            connections: core.connections_of(token).len(),
            destinations: core.get_connected_chains(token).join(", "),
        })
        .collect()
}

fn print_tokens(snapshot: &WarpSnapshot) {
    println!("{}", Table::new(token_rows(snapshot)).with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp_config::WarpCoreConfig;
    use serde_json::json;

    #[test]
    fn test_parse_token_ref() {
        assert_eq!(
            parse_token_ref("ethereum:0xAbC").unwrap(),
            ("ethereum", "0xAbC")
        );
        assert!(parse_token_ref("ethereum").is_err());
        assert!(parse_token_ref(":0xabc").is_err());
        assert!(parse_token_ref("ethereum:").is_err());
    }

    #[tokio::test]
    async fn test_token_rows_list_connected_chains() {
        let chain = |name: &str, domain: u32| {
            json!({
                "name": name,
                "protocol": "ethereum",
                "chainId": domain,
                "domainId": domain,
                "rpcUrls": [{"http": format!("https://{}.rpc.example.com", name)}]
            })
        };
        let token = |chain: &str, address: &str, connections: Vec<&str>| {
            json!({
                "chainName": chain,
                "standard": "EvmHypSynthetic",
                "decimals": 18,
                "symbol": "WETH",
                "name": "Wrapped Ether",
                "addressOrDenom": address,
                "connections": connections.into_iter().map(|c| json!({"token": c})).collect::<Vec<_>>()
            })
        };
        let route = WarpCoreConfig::from_value(
            "weth",
            json!({"tokens": [
                token("ethereum", "0xA1", vec!["ethereum|arbitrum|0xb1", "ethereum|base|0xc1"]),
                token("arbitrum", "0xB1", vec!["ethereum|ethereum|0xa1"]),
                token("base", "0xC1", vec![]),
            ]}),
        )
        .unwrap();
        let registry = StaticRegistry::new()
            .with_chain("ethereum", chain("ethereum", 1))
            .with_chain("arbitrum", chain("arbitrum", 42161))
            .with_chain("base", chain("base", 8453))
            .with_warp_route(route);
        let context = WarpContext::new(Arc::new(registry), Arc::new(LogNotifier));
        assert_eq!(context.initialize().await, AssemblyStatus::Committed);

        let rows = token_rows(&context.snapshot());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].connections, 2);
        assert_eq!(rows[0].destinations, "arbitrum, base");
        assert_eq!(rows[1].destinations, "ethereum");
        assert_eq!(rows[2].destinations, "");
    }

    #[test]
    fn test_resolve_requires_endpoints() {
        let result = CliApp::build_cli().try_get_matches_from(["warp-route", "--resolve"]);
        assert!(result.is_err());

        let matches = CliApp::build_cli()
            .try_get_matches_from([
                "warp-route",
                "--resolve",
                "--origin",
                "ethereum:0xaa",
                "--destination",
                "arbitrum:0xbb",
                "--fallback",
            ])
            .unwrap();
        assert!(matches.get_flag(FALLBACK_ARG));
        assert_eq!(required(&matches, ORIGIN_ARG).unwrap(), "ethereum:0xaa");
    }
}
