use tracing::debug;

use crate::dashroute_core::alias::AliasResolver;
use crate::dashroute_core::error::NavigationError;
use crate::dashroute_core::origin::{Origin, OriginFamily, Page, RenderInput};
use crate::dashroute_core::route::{Catalog, RouteTemplate};
use crate::dashroute_core::types::{CanonicalParams, PathParams, QueryPairs};

//
// ========== 导航宿主边界：redirect 原语 / 导航结果 ==========
//

/// 外部导航宿主（浏览器 history、桌面壳等）提供的重定向原语。
///
/// 每次导航最多被调用一次：用 canonical 地址替换当前地址。
pub trait NavigationHost {
    fn redirect(&mut self, target: &RouteTemplate, params: &PathParams, query: &QueryPairs);
}

/// 一次导航落定到 canonical 模板之后的结果。
///
/// - `params` 是 canonical 参数名下的 path 参数
/// - `query` 是应用过 canonical schema 的类型化 query
/// - `raw_query` 保留透传过来的原始 query，便于页面原样回写
#[derive(Debug, Clone)]
pub struct NavigationOutcome<'c> {
    pub template: &'c RouteTemplate,
    pub params: PathParams,
    pub query: CanonicalParams,
    pub raw_query: QueryPairs,

    /// 交给页面的来源族：重定向时取别名声明的，否则取 canonical 自己声明的。
    pub origin: Option<Origin>,

    /// 如果经过了一跳重定向，记录命中的别名模板。
    pub redirected_from: Option<&'c RouteTemplate>,
}

impl<'c> NavigationOutcome<'c> {
    fn settle(
        template: &'c RouteTemplate,
        params: PathParams,
        raw_query: QueryPairs,
        origin: Option<Origin>,
        redirected_from: Option<&'c RouteTemplate>,
    ) -> Self {
        let query = template
            .query_schema()
            .map(|schema| schema.apply(&raw_query))
            .unwrap_or_default();
        Self {
            template,
            params,
            query,
            raw_query,
            origin,
            redirected_from,
        }
    }

    /// 交给页面组件渲染。
    ///
    /// 其它资源的 origin 对该页面视为缺失。
    pub fn render<P: Page>(self, page: &P) -> P::Output {
        let origin = self.origin.and_then(P::Family::from_origin);
        page.render(RenderInput {
            template: self.template,
            params: self.params,
            query: self.query,
            origin,
        })
    }
}

/// 导航入口：匹配 → 解析别名 → （至多一次）重定向 → 落定到 canonical。
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'c> {
    catalog: &'c Catalog,
    resolver: AliasResolver<'c>,
}

impl<'c> Navigator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            resolver: AliasResolver::new(catalog),
        }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// 处理一次导航。
    ///
    /// 错误原样向上传播，由渲染当前导航结果的一方决定展示哪个错误视图
    /// （见 [`NavigationError::view`]）；失败时不会调用 `host.redirect`。
    pub fn navigate<H>(
        &self,
        url: &str,
        host: &mut H,
    ) -> Result<NavigationOutcome<'c>, NavigationError>
    where
        H: NavigationHost + ?Sized,
    {
        let nav = self.catalog.lookup(url)?;
        match self.resolver.resolve(&nav)? {
            None => Ok(NavigationOutcome::settle(
                nav.template,
                nav.path_params,
                nav.query,
                nav.template.origin,
                None,
            )),
            Some(redirect) => {
                host.redirect(redirect.target, &redirect.params, &redirect.query);
                debug!(
                    from = nav.template.pattern.as_str(),
                    to = redirect.target.pattern.as_str(),
                    "navigation redirected"
                );
                Ok(NavigationOutcome::settle(
                    redirect.target,
                    redirect.params,
                    redirect.query,
                    redirect.origin.or(redirect.target.origin),
                    Some(nav.template),
                ))
            }
        }
    }
}
