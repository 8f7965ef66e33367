use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use matchit::{InsertError, Router as MatchitRouter};
use percent_encoding::percent_decode_str;
use tracing::{debug, info};

use super::meta::{
    AliasSpec, ParamMapping, ParamSource, PathPattern, RouteTemplate, TemplateRole, TemplateSpec,
};
use super::resolved::ResolvedNavigation;
use crate::dashroute_core::error::{CatalogError, LinkError, NavigationError};
use crate::dashroute_core::origin::Origin;
use crate::dashroute_core::types::{PathParams, QueryPairs, RouteId};

/// 路由模板表的构建期形态。
///
/// 只在进程启动时使用：逐条 `register`，全部成功后 `freeze` 成只读的
/// [`Catalog`]。注册顺序是前置条件：canonical 必须先于它的别名注册。
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    templates: Vec<RouteTemplate>,
    pattern_index: HashMap<String, RouteId>,
    name_index: HashMap<String, RouteId>,

    /// 位置化骨架 -> RouteId，用于歧义检测。
    shape_index: HashMap<String, RouteId>,

    path_router: MatchitRouter<RouteId>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一条模板。
    ///
    /// 任何校验失败都不会留下部分状态：索引和 matchit 只在全部检查通过后写入。
    pub fn register(&mut self, spec: impl Into<TemplateSpec>) -> Result<RouteId, CatalogError> {
        let spec = spec.into();
        let pattern = PathPattern::parse(spec.pattern())?;

        if self.pattern_index.contains_key(pattern.as_str()) {
            return Err(CatalogError::DuplicatePattern {
                pattern: pattern.as_str().to_owned(),
            });
        }

        let skeleton = pattern.skeleton();
        if let Some(existing) = self.shape_index.get(&skeleton) {
            return Err(CatalogError::AmbiguousRoute {
                pattern: pattern.as_str().to_owned(),
                existing: self.template(*existing).pattern.as_str().to_owned(),
            });
        }

        let (name, origin_tag) = match &spec {
            TemplateSpec::Canonical(spec) => (spec.name.clone(), spec.origin.clone()),
            TemplateSpec::Alias(spec) => (spec.name.clone(), spec.origin.clone()),
        };
        if let Some(name) = &name {
            if let Some(existing) = self.name_index.get(name) {
                return Err(CatalogError::DuplicateName {
                    name: name.clone(),
                    pattern: pattern.as_str().to_owned(),
                    existing: self.template(*existing).pattern.as_str().to_owned(),
                });
            }
        }

        let (resource, role) = match spec {
            TemplateSpec::Canonical(spec) => {
                spec.query.validate(pattern.as_str())?;
                (spec.resource, TemplateRole::Canonical { query: spec.query })
            }
            TemplateSpec::Alias(spec) => {
                let (target, mapping) = self.alias_mapping(&pattern, &spec)?;
                (
                    self.template(target).resource,
                    TemplateRole::Alias { target, mapping },
                )
            }
        };

        let origin = match origin_tag {
            Some(tag) => Some(Origin::parse(resource, &tag).ok_or_else(|| {
                CatalogError::InvalidOrigin {
                    pattern: pattern.as_str().to_owned(),
                    resource: resource.to_string(),
                    tag,
                }
            })?),
            None => None,
        };

        let id = RouteId(self.templates.len() as u32);
        self.path_router
            .insert(skeleton.clone(), id)
            .map_err(|err| match err {
                InsertError::Conflict { with } => CatalogError::AmbiguousRoute {
                    pattern: pattern.as_str().to_owned(),
                    existing: with,
                },
                other => CatalogError::InvalidPattern {
                    pattern: pattern.as_str().to_owned(),
                    reason: other.to_string(),
                },
            })?;

        debug!(
            pattern = pattern.as_str(),
            canonical = matches!(role, TemplateRole::Canonical { .. }),
            "route template registered"
        );

        self.pattern_index.insert(pattern.as_str().to_owned(), id);
        self.shape_index.insert(skeleton, id);
        if let Some(name) = &name {
            self.name_index.insert(name.clone(), id);
        }
        self.templates.push(RouteTemplate {
            id,
            pattern,
            name,
            resource,
            role,
            origin,
        });
        Ok(id)
    }

    /// 校验别名映射并解析出目标 ID。
    ///
    /// - 目标必须已注册且是 canonical（禁止别名 -> 别名）
    /// - canonical 的每个参数都有来源：改名或固定值，二选一
    /// - 别名的每个参数恰好被一个 canonical 参数消费
    fn alias_mapping(
        &self,
        pattern: &PathPattern,
        spec: &AliasSpec,
    ) -> Result<(RouteId, ParamMapping), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidAliasMapping {
            alias: pattern.as_str().to_owned(),
            reason,
        };

        let target_key = spec.target.trim_start_matches('/');
        let target_id = *self
            .pattern_index
            .get(target_key)
            .ok_or_else(|| invalid(format!("target `{target_key}` is not registered")))?;
        let target = self.template(target_id);
        if !target.is_canonical() {
            return Err(invalid(format!(
                "target `{target_key}` is an alias, not a canonical route"
            )));
        }

        let alias_params: BTreeSet<&str> = pattern.params().collect();
        let canonical_params: BTreeSet<&str> = target.pattern.params().collect();

        for key in spec.rename.keys().chain(spec.fixed.keys()) {
            if !canonical_params.contains(key.as_str()) {
                return Err(invalid(format!("`{key}` is not a parameter of `{target_key}`")));
            }
        }

        let mut consumed = BTreeSet::new();
        let mut entries = BTreeMap::new();
        for param in &canonical_params {
            let source = match (spec.rename.get(*param), spec.fixed.get(*param)) {
                (Some(_), Some(_)) => {
                    return Err(invalid(format!("`{param}` is both renamed and fixed")));
                }
                (Some(alias_param), None) => {
                    if !alias_params.contains(alias_param.as_str()) {
                        return Err(invalid(format!(
                            "`{alias_param}` is not a parameter of the alias"
                        )));
                    }
                    if !consumed.insert(alias_param.as_str()) {
                        return Err(invalid(format!(
                            "alias parameter `{alias_param}` is mapped twice"
                        )));
                    }
                    ParamSource::Rename(alias_param.clone())
                }
                (None, Some(value)) if value.is_empty() => {
                    return Err(invalid(format!("fixed value for `{param}` is empty")));
                }
                (None, Some(value)) => ParamSource::Fixed(value.clone()),
                (None, None) => {
                    return Err(invalid(format!("no source for canonical parameter `{param}`")));
                }
            };
            entries.insert((*param).to_owned(), source);
        }

        if let Some(unused) = alias_params.difference(&consumed).next() {
            return Err(invalid(format!(
                "alias parameter `{unused}` is not mapped onto `{target_key}`"
            )));
        }

        Ok((target_id, ParamMapping::new(entries)))
    }

    fn template(&self, id: RouteId) -> &RouteTemplate {
        &self.templates[id.0 as usize]
    }

    /// 结束注册，得到只读的 Catalog。
    pub fn freeze(self) -> Catalog {
        let canonical = self.templates.iter().filter(|t| t.is_canonical()).count();
        info!(
            templates = self.templates.len(),
            canonical,
            aliases = self.templates.len() - canonical,
            "route catalog frozen"
        );
        Catalog {
            templates: self.templates,
            pattern_index: self.pattern_index,
            name_index: self.name_index,
            path_router: self.path_router,
        }
    }
}

/// 只读的路由模板表：
///
/// - 所有 RouteTemplate（Vec，下标即 RouteId）
/// - pattern -> RouteId 索引
/// - name -> RouteId 索引
/// - path -> RouteId 匹配（基于 matchit，按位置化骨架注册）
///
/// 进程启动时构建一次，之后只读；并发导航无需任何协调即可共享。
#[derive(Debug)]
pub struct Catalog {
    templates: Vec<RouteTemplate>,

    /// pattern 索引："tree/{treeId}" -> RouteId
    pattern_index: HashMap<String, RouteId>,

    /// name 索引："tree.detail" -> RouteId
    name_index: HashMap<String, RouteId>,

    /// 例如：
    ///     "/tree/{p0}" -> RouteId(1)
    ///     "/issue/{p0}/version/{p1}" -> RouteId(6)
    path_router: MatchitRouter<RouteId>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn get(&self, id: RouteId) -> Option<&RouteTemplate> {
        self.templates.get(id.0 as usize)
    }

    pub fn by_pattern(&self, pattern: &str) -> Option<&RouteTemplate> {
        let id = self.pattern_index.get(pattern.trim_start_matches('/'))?;
        self.get(*id)
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteTemplate> {
        let id = self.name_index.get(name)?;
        self.get(*id)
    }

    pub fn templates(&self) -> &[RouteTemplate] {
        &self.templates
    }

    /// 把一个具体 URL（可带 query 与 fragment）匹配到模板。
    ///
    /// 每个位置上字面量优先于参数，即最长字面量前缀胜出；骨架相同的
    /// 模板在注册期就被拒绝，所以这里不会出现平局。
    ///
    /// path 参数与 query 的 percent-decode 必须得到合法 UTF-8，否则按
    /// `NoMatch` 处理：值要原样交给重定向，不能被替换字符悄悄改写。
    pub fn lookup(&self, url: &str) -> Result<ResolvedNavigation<'_>, NavigationError> {
        let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
        let (path, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));
        let normalized = format!("/{}", path.trim_start_matches('/'));

        let matched = self
            .path_router
            .at(&normalized)
            .map_err(|_| NavigationError::NoMatch {
                path: path.to_owned(),
            })?;
        let id = *matched.value;
        let template = self.get(id).ok_or_else(|| NavigationError::NoMatch {
            path: path.to_owned(),
        })?;

        let not_utf8 = || {
            debug!(url, "percent-decoded navigation is not valid UTF-8");
            NavigationError::NoMatch {
                path: path.to_owned(),
            }
        };

        let path_params = template
            .pattern
            .params()
            .zip(matched.params.iter())
            .map(|(name, (_, raw))| Some((name.to_owned(), decode_component(raw)?)))
            .collect::<Option<PathParams>>()
            .ok_or_else(not_utf8)?;

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Some((decode_form(key)?, decode_form(value)?))
            })
            .collect::<Option<QueryPairs>>()
            .ok_or_else(not_utf8)?;

        debug!(url, pattern = template.pattern.as_str(), "navigation matched");
        Ok(ResolvedNavigation::new(template, path_params, query))
    }

    /// 为已注册的模板构造链接。
    pub fn href(
        &self,
        pattern: &str,
        params: &PathParams,
        query: &QueryPairs,
    ) -> Result<String, LinkError> {
        let template = self
            .by_pattern(pattern)
            .ok_or_else(|| LinkError::UnknownPattern {
                pattern: pattern.to_owned(),
            })?;
        template.pattern.build(params, query)
    }
}

/// path 段：只做 percent-decode。
fn decode_component(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|value| value.into_owned())
}

/// query 的 key / value：`application/x-www-form-urlencoded`，`+` 表示空格。
fn decode_form(raw: &str) -> Option<String> {
    decode_component(&raw.replace('+', " "))
}

static INSTALLED: OnceLock<Catalog> = OnceLock::new();

/// 把 Catalog 安装为进程级只读句柄。只能安装一次。
pub fn install(catalog: Catalog) -> Result<&'static Catalog, CatalogError> {
    INSTALLED
        .set(catalog)
        .map_err(|_| CatalogError::AlreadyInstalled)?;
    INSTALLED.get().ok_or(CatalogError::AlreadyInstalled)
}

pub fn installed() -> Option<&'static Catalog> {
    INSTALLED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashroute_core::route::{AliasSpec, CanonicalSpec};
    use crate::dashroute_core::types::ResourceKind;

    fn tree_builder() -> CatalogBuilder {
        let mut builder = CatalogBuilder::new();
        builder
            .register(CanonicalSpec::new("tree/{treeId}", ResourceKind::Tree).named("tree.detail"))
            .unwrap();
        builder
            .register(CanonicalSpec::new("tree/{treeName}/{branch}", ResourceKind::Tree))
            .unwrap();
        builder
    }

    #[test]
    fn duplicate_pattern_is_rejected() {
        let mut builder = tree_builder();
        let err = builder
            .register(CanonicalSpec::new("/tree/{treeId}", ResourceKind::Tree))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DuplicatePattern { pattern } if pattern == "tree/{treeId}"
        ));
    }

    #[test]
    fn same_shape_with_other_names_is_ambiguous() {
        let mut builder = tree_builder();
        builder
            .register(AliasSpec::new("t/{treeId}", "tree/{treeId}").rename("treeId", "treeId"))
            .unwrap();
        builder
            .register(CanonicalSpec::new("test/{testId}", ResourceKind::Test))
            .unwrap();
        let err = builder
            .register(AliasSpec::new("t/{testId}", "test/{testId}").rename("testId", "testId"))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::AmbiguousRoute { pattern, existing }
                if pattern == "t/{testId}" && existing == "t/{treeId}"
        ));
    }

    #[test]
    fn alias_must_target_a_registered_canonical() {
        let mut builder = tree_builder();
        let err = builder
            .register(AliasSpec::new("b/{buildId}", "build/{buildId}").rename("buildId", "buildId"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidAliasMapping { .. }));

        builder
            .register(AliasSpec::new("t/{treeId}", "tree/{treeId}").rename("treeId", "treeId"))
            .unwrap();
        let err = builder
            .register(AliasSpec::new("tt/{treeId}", "t/{treeId}").rename("treeId", "treeId"))
            .unwrap_err();
        assert!(
            matches!(
                &err,
                CatalogError::InvalidAliasMapping { reason, .. } if reason.contains("is an alias")
            ),
            "{err}"
        );
    }

    #[test]
    fn alias_mapping_must_cover_every_canonical_param() {
        let mut builder = tree_builder();
        let err = builder
            .register(
                AliasSpec::new("c/{treeName}", "tree/{treeName}/{branch}")
                    .rename("treeName", "treeName"),
            )
            .unwrap_err();
        assert!(
            matches!(
                &err,
                CatalogError::InvalidAliasMapping { reason, .. } if reason.contains("`branch`")
            ),
            "{err}"
        );

        builder
            .register(
                AliasSpec::new("c/{treeName}", "tree/{treeName}/{branch}")
                    .rename("treeName", "treeName")
                    .fixed("branch", "master"),
            )
            .unwrap();
    }

    #[test]
    fn alias_params_must_all_be_consumed() {
        let mut builder = tree_builder();
        let err = builder
            .register(
                AliasSpec::new("t/{treeId}/{extra}", "tree/{treeId}").rename("treeId", "treeId"),
            )
            .unwrap_err();
        assert!(
            matches!(
                &err,
                CatalogError::InvalidAliasMapping { reason, .. } if reason.contains("`extra`")
            ),
            "{err}"
        );
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut builder = tree_builder();
        let err = builder
            .register(CanonicalSpec::new("tree/", ResourceKind::Tree).named("tree.detail"))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DuplicateName { name, pattern, existing }
                if name == "tree.detail" && pattern == "tree/" && existing == "tree/{treeId}"
        ));
    }

    #[test]
    fn failed_registration_leaves_no_state() {
        let mut builder = tree_builder();
        let err = builder
            .register(
                AliasSpec::new("t/{treeId}", "tree/{treeId}")
                    .origin("not-a-family")
                    .rename("treeId", "treeId"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidOrigin { pattern, resource, tag }
                if pattern == "t/{treeId}" && resource == "tree" && tag == "not-a-family"
        ));
        builder
            .register(AliasSpec::new("t/{treeId}", "tree/{treeId}").rename("treeId", "treeId"))
            .unwrap();
    }

    #[test]
    fn lookup_prefers_literals_and_decodes_values() {
        let mut builder = tree_builder();
        builder
            .register(CanonicalSpec::new("tree/", ResourceKind::Tree).named("tree.list"))
            .unwrap();
        let catalog = builder.freeze();

        let nav = catalog.lookup("/tree/linux%20next/master?tab=boots#top").unwrap();
        assert_eq!(nav.template.pattern.as_str(), "tree/{treeName}/{branch}");
        assert_eq!(nav.path_params["treeName"], "linux next");
        assert_eq!(nav.query.get("tab"), Some("boots"));

        assert_eq!(catalog.lookup("tree/").unwrap().template.name.as_deref(), Some("tree.list"));
        assert_eq!(catalog.by_name("tree.detail").unwrap().pattern.as_str(), "tree/{treeId}");
        assert!(matches!(
            catalog.lookup("/zzz/nope"),
            Err(NavigationError::NoMatch { path }) if path == "/zzz/nope"
        ));
    }

    #[test]
    fn lookup_keeps_repeated_query_keys_in_order() {
        let catalog = tree_builder().freeze();
        let nav = catalog
            .lookup("tree/7f3a?search=a&tab=boots&search=b+c&empty=&flag")
            .unwrap();
        assert_eq!(
            nav.query,
            QueryPairs::from([
                ("search", "a"),
                ("tab", "boots"),
                ("search", "b c"),
                ("empty", ""),
                ("flag", ""),
            ])
        );
        assert_eq!(nav.query.get_all("search").collect::<Vec<_>>(), ["a", "b c"]);
        assert_eq!(nav.query.get("search"), Some("b c"));
    }

    #[test]
    fn lookup_rejects_values_that_are_not_utf8() {
        let catalog = tree_builder().freeze();
        assert!(matches!(
            catalog.lookup("tree/%FF%FE"),
            Err(NavigationError::NoMatch { path }) if path == "tree/%FF%FE"
        ));
        assert!(matches!(
            catalog.lookup("tree/7f3a?x=%FF"),
            Err(NavigationError::NoMatch { path }) if path == "tree/7f3a"
        ));
        assert_eq!(catalog.lookup("tree/%E2%9C%93").unwrap().path_params["treeId"], "✓");
    }
}
