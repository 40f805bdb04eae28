use log::debug;
use std::sync::Arc;

use crate::core::connection_graph::WarpCore;
use crate::core::types::{ResolvedTransferRoute, Token};
use crate::utils::addresses_equal;

/// 同链且地址（按协议规范化后）相同
fn same_address(a: &Token, b: &Token) -> bool {
    a.protocol() == b.protocol()
        && addresses_equal(a.protocol(), a.address_or_denom(), b.address_or_denom())
}

/// 两个目标 token 是否代表同一份抵押资产
///
/// 双方都有非空抵押地址且相等，或者双方都是没有抵押地址的原生 gas 表示。
pub fn has_same_destination_collateral(a: &Token, b: &Token) -> bool {
    match (a.normalized_collateral(), b.normalized_collateral()) {
        (Some(left), Some(right)) => a.protocol() == b.protocol() && left == right,
        (None, None) => a.is_hyp_native() && b.is_hyp_native(),
        _ => false,
    }
}

/// 边的目标 token `a` 是否满足所请求的目标 token `b`
pub fn matches_destination_token(a: &Token, b: &Token, allow_collateral_fallback: bool) -> bool {
    if a.chain_name() != b.chain_name() {
        return false;
    }
    if same_address(a, b) {
        return true;
    }
    if !allow_collateral_fallback {
        return false;
    }
    has_same_destination_collateral(a, b)
}

/// 路由 token 与起点 token 是否代表同一资产
///
/// 最后一步按符号比较只是启发式：不同资产可能共用同一个符号。
pub fn has_same_origin_asset(route_token: &Token, origin_token: &Token) -> bool {
    if route_token.chain_name() != origin_token.chain_name() {
        return false;
    }
    if same_address(route_token, origin_token) {
        return true;
    }
    if let (Some(left), Some(right)) = (
        route_token.normalized_collateral(),
        origin_token.normalized_collateral(),
    ) {
        return left == right;
    }
    if route_token.is_hyp_native() && origin_token.is_hyp_native() {
        return true;
    }
    route_token.symbol() == origin_token.symbol()
}

/// 在一份只读快照上解析转账路由
pub struct RouteResolver<'a> {
    warp_core: &'a WarpCore,
}

impl<'a> RouteResolver<'a> {
    pub fn new(warp_core: &'a WarpCore) -> Self {
        Self { warp_core }
    }

    /// 为起点 token 和目标 token 寻找已注册的路由
    ///
    /// 直接连接优先；否则在起点链上寻找代表同一资产的其他表示。
    /// 找不到时返回 `None`，这是正常结果而不是错误。
    pub fn resolve_transfer_route(
        &self,
        origin_token: &Arc<Token>,
        destination_token: &Token,
        allow_destination_collateral_fallback: bool,
    ) -> Option<ResolvedTransferRoute> {
        let direct = self
            .warp_core
            .connections_of(origin_token)
            .iter()
            .find(|c| {
                matches_destination_token(
                    &c.token,
                    destination_token,
                    allow_destination_collateral_fallback,
                )
            });
        if let Some(connection) = direct {
            debug!("直接连接匹配: {} -> {}", origin_token.id(), connection.token.id());
            return Some(ResolvedTransferRoute {
                origin_token: origin_token.clone(),
                destination_token: connection.token.clone(),
            });
        }

        let route_tokens = self
            .warp_core
            .get_tokens_for_route(origin_token.chain_name(), destination_token.chain_name());
        if route_tokens.is_empty() {
            debug!(
                "{} -> {} 没有已注册的路由 token",
                origin_token.chain_name(),
                destination_token.chain_name()
            );
            return None;
        }

        for candidate in route_tokens {
            if candidate.chain_name() != origin_token.chain_name()
                || !has_same_origin_asset(&candidate, origin_token)
            {
                continue;
            }
            let matched = self.warp_core.connections_of(&candidate).iter().find(|c| {
                matches_destination_token(
                    &c.token,
                    destination_token,
                    allow_destination_collateral_fallback,
                )
            });
            if let Some(connection) = matched {
                debug!("跨表示匹配: {} -> {}", candidate.id(), connection.token.id());
                return Some(ResolvedTransferRoute {
                    destination_token: connection.token.clone(),
                    origin_token: candidate,
                });
            }
        }

        debug!(
            "未找到路由: {} -> {}",
            origin_token.id(),
            destination_token.id()
        );
        None
    }
}
