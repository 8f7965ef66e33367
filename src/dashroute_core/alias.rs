use tracing::debug;

use crate::dashroute_core::error::NavigationError;
use crate::dashroute_core::origin::Origin;
use crate::dashroute_core::route::{
    Catalog, ParamSource, ResolvedNavigation, RouteTemplate, TemplateRole,
};
use crate::dashroute_core::types::{PathParams, QueryPairs};

/// 一跳重定向指令。
///
/// 由 [`AliasResolver`] 产生，交给导航方恰好消费一次；不重试、不缓存。
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectInstruction<'c> {
    /// canonical 目标模板。
    pub target: &'c RouteTemplate,

    /// 按别名声明的映射改名后的参数（值原样，不做变换）。
    pub params: PathParams,

    /// 原导航的 query，原样透传。
    pub query: QueryPairs,

    /// 别名声明的来源族标签。
    pub origin: Option<Origin>,
}

/// 别名解析器。
///
/// 纯函数：只读 Catalog 与当次导航的参数，没有任何可变状态。
#[derive(Debug, Clone, Copy)]
pub struct AliasResolver<'c> {
    catalog: &'c Catalog,
}

impl<'c> AliasResolver<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// canonical 模板返回 `Ok(None)`；别名返回指向 canonical 的重定向。
    ///
    /// 任何一个 canonical 参数拿不到值都是硬失败，不会产生部分重定向。
    pub fn resolve(
        &self,
        nav: &ResolvedNavigation<'_>,
    ) -> Result<Option<RedirectInstruction<'c>>, NavigationError> {
        let TemplateRole::Alias { target, mapping } = &nav.template.role else {
            return Ok(None);
        };
        let alias = nav.template.pattern.as_str();
        let target = self.catalog.get(*target).ok_or_else(|| NavigationError::NoMatch {
            path: alias.to_owned(),
        })?;
        debug_assert!(target.is_canonical(), "alias `{alias}` targets another alias");

        let mut params = PathParams::new();
        for (canonical_param, source) in mapping.iter() {
            let value = match source {
                ParamSource::Rename(alias_param) => nav
                    .path_params
                    .get(alias_param)
                    .filter(|value| !value.is_empty())
                    .cloned()
                    .ok_or_else(|| NavigationError::UnsatisfiableAlias {
                        alias: alias.to_owned(),
                        target: target.pattern.as_str().to_owned(),
                        param: canonical_param.to_owned(),
                    })?,
                ParamSource::Fixed(value) => value.clone(),
            };
            params.insert(canonical_param.to_owned(), value);
        }

        debug!(
            alias,
            target = target.pattern.as_str(),
            origin = nav.template.origin.map(|origin| origin.tag()),
            "alias resolved to canonical route"
        );

        Ok(Some(RedirectInstruction {
            target,
            params,
            query: nav.query.clone(),
            origin: nav.template.origin,
        }))
    }
}
