use super::meta::RouteTemplate;
use crate::dashroute_core::types::{PathParams, QueryPairs, RouteId};

/// 一次导航在 Catalog 上的匹配结果。
///
/// - 绑定了具体的 RouteTemplate
/// - 含 path 参数（按位置取出并做了 percent-decode）
/// - 含原始 query（尚未经过任何 schema 校验）
///
/// 每次导航新建，只归产生它的解析步骤所有，不做持久化。
#[derive(Debug, Clone)]
pub struct ResolvedNavigation<'a> {
    /// 模板 ID。
    pub id: RouteId,

    /// 命中的模板。
    pub template: &'a RouteTemplate,

    /// path 参数（"treeId" -> "7f3a"）。
    pub path_params: PathParams,

    /// query 参数，按出现顺序保留全部 key/value 对。
    pub query: QueryPairs,
}

impl<'a> ResolvedNavigation<'a> {
    pub fn new(template: &'a RouteTemplate, path_params: PathParams, query: QueryPairs) -> Self {
        Self {
            id: template.id,
            template,
            path_params,
            query,
        }
    }
}
