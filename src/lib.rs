//! Warp Route - 跨链 token 路由解析与配置装配
//!
//! 从注册表获取链元数据和 warp 路由配置，叠加调用方覆盖后发布只读快照，
//! 并在快照上为一次转账解析起点/终点 token 对。

pub mod adapters;
pub mod assembler;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod notify;
pub mod provider;
pub mod registry;
pub mod utils;
pub mod warp_config;

// 重新导出常用类型
pub use assembler::{AssemblyStatus, WarpContext, WarpSnapshot};
pub use config::Config;
pub use crate::core::{ConnectionType, ResolvedTransferRoute, RouteResolver, Token, TokenAmount, TokenStandard, WarpCore};
pub use errors::{WarpError, WarpResult};
pub use provider::MultiProtocolProvider;
pub use registry::{HttpRegistry, Registry, StaticRegistry};
pub use warp_config::{ChainMetadata, ChainMetadataOverrides, WarpCoreConfig};
