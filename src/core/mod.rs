pub mod amount;
pub mod connection_graph;
pub mod route_resolver;
pub mod types;

// 重新导出核心类型，方便外部使用
pub use amount::TokenAmount;
pub use connection_graph::{ConnectionType, TokenConnection, WarpCore};
pub use route_resolver::{
    has_same_destination_collateral, has_same_origin_asset, matches_destination_token,
    RouteResolver,
};
pub use types::*;
