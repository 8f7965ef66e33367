use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Deserialize;
use url::form_urlencoded;

use crate::dashroute_core::error::{CatalogError, LinkError};
use crate::dashroute_core::origin::Origin;
use crate::dashroute_core::query::{QueryField, QuerySchema};
use crate::dashroute_core::types::{PathParams, QueryPairs, ResourceKind, RouteId};

/// path 参数值在拼接链接时需要转义的字符。
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 路径模式中的一段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// 字面量，例如 `tree`、`version`。
    Literal(String),

    /// 具名参数占位，例如 `{treeId}` 中的 `treeId`。
    Param(String),
}

/// 解析后的路径模式。
///
/// 统一去掉开头的 `/`，保留结尾的 `/`（列表页，例如 `issue/`）。
/// 规范化后的字符串同时是模板在 Catalog 里的唯一 key。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    trailing_slash: bool,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: reason.to_owned(),
        };

        let normalized = pattern.trim_start_matches('/');
        let (body, trailing_slash) = match normalized.strip_suffix('/') {
            Some(body) => (body, true),
            None => (normalized, false),
        };
        if body.is_empty() {
            return Err(invalid("pattern has no segments"));
        }

        let mut segments = Vec::new();
        for part in body.split('/') {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if !is_identifier(name) {
                    return Err(invalid("parameter names must be identifiers"));
                }
                if segments.contains(&Segment::Param(name.to_owned())) {
                    return Err(invalid("parameter name used twice"));
                }
                segments.push(Segment::Param(name.to_owned()));
            } else if part.contains(['{', '}', '?', '#']) {
                return Err(invalid("literal segments may not contain `{`, `}`, `?` or `#`"));
            } else {
                segments.push(Segment::Literal(part.to_owned()));
            }
        }

        Ok(Self {
            raw: normalized.to_owned(),
            segments,
            trailing_slash,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// 按出现顺序列出参数名。
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// 位置化骨架：参数名统一替换为 `{p0}`、`{p1}` …，并带上开头的 `/`。
    ///
    /// 两个模板骨架相同，说明它们能以相同的优先级命中同一条具体路径。
    /// matchit 也以骨架注册，这样不同参数名出现在同一位置不会互相冲突。
    pub fn skeleton(&self) -> String {
        let mut out = String::new();
        let mut position = 0;
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(_) => {
                    out.push_str(&format!("{{p{position}}}"));
                    position += 1;
                }
            }
        }
        if self.trailing_slash {
            out.push('/');
        }
        out
    }

    /// 用具体参数值拼出链接，例如 `/tree/linux-next/master?tab=boots`。
    pub fn build(&self, params: &PathParams, query: &QueryPairs) -> Result<String, LinkError> {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) => {
                    let value = params
                        .get(name)
                        .filter(|value| !value.is_empty())
                        .ok_or_else(|| LinkError::MissingParam {
                            pattern: self.raw.clone(),
                            param: name.clone(),
                        })?;
                    out.push_str(&utf8_percent_encode(value, SEGMENT).to_string());
                }
            }
        }
        if self.trailing_slash {
            out.push('/');
        }
        if !query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter())
                .finish();
            out.push('?');
            out.push_str(&encoded);
        }
        Ok(out)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 别名参数到 canonical 参数的来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// 1:1 改名：取别名路径中该参数的原始字符串。
    Rename(String),

    /// 由别名定义提供的固定值。
    Fixed(String),
}

/// canonical 参数名 -> 来源。注册时保证覆盖 canonical 模板的全部参数。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMapping {
    entries: BTreeMap<String, ParamSource>,
}

impl ParamMapping {
    pub(crate) fn new(entries: BTreeMap<String, ParamSource>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSource)> {
        self.entries.iter().map(|(name, source)| (name.as_str(), source))
    }

    pub fn source(&self, canonical_param: &str) -> Option<&ParamSource> {
        self.entries.get(canonical_param)
    }
}

/// 模板的角色：canonical 或别名。
///
/// query schema 只挂在 canonical 上，别名只描述如何映射到目标。
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateRole {
    Canonical {
        query: QuerySchema,
    },
    Alias {
        target: RouteId,
        mapping: ParamMapping,
    },
}

/// 单条已注册的路由模板。
///
/// 只能由 `CatalogBuilder::register` 生成，Catalog freeze 之后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTemplate {
    /// 唯一模板 ID，同时是它在 Catalog 中的下标。
    pub id: RouteId,

    /// 路径模式，例如：
    /// - "tree/{treeId}"
    /// - "c/{treeName}/{branch}"
    /// - "issue/"
    pub pattern: PathPattern,

    /// 人类可读的模板名，例如 "tree.detail"、"issue.list"。
    pub name: Option<String>,

    /// 模板指向的资源类型。别名继承其目标的资源类型。
    pub resource: ResourceKind,

    /// canonical / 别名。
    pub role: TemplateRole,

    /// 声明的来源族标签。
    ///
    /// - 别名：重定向时传给目标页面（例如 `c/...` 带 checkout-alias）
    /// - canonical：直接进入该模板时传给页面（例如 name+branch 形式的路径）
    pub origin: Option<Origin>,
}

impl RouteTemplate {
    pub fn is_canonical(&self) -> bool {
        matches!(self.role, TemplateRole::Canonical { .. })
    }

    pub fn query_schema(&self) -> Option<&QuerySchema> {
        match &self.role {
            TemplateRole::Canonical { query } => Some(query),
            TemplateRole::Alias { .. } => None,
        }
    }

    /// 别名的目标模板 ID；canonical 返回 None。
    pub fn alias_target(&self) -> Option<RouteId> {
        match &self.role {
            TemplateRole::Alias { target, .. } => Some(*target),
            TemplateRole::Canonical { .. } => None,
        }
    }
}

//
// ========== 注册声明 ==========
//

/// canonical 模板的注册声明。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalSpec {
    pub pattern: String,
    pub resource: ResourceKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub query: QuerySchema,
    #[serde(default)]
    pub origin: Option<String>,
}

impl CanonicalSpec {
    pub fn new(pattern: impl Into<String>, resource: ResourceKind) -> Self {
        Self {
            pattern: pattern.into(),
            resource,
            name: None,
            query: QuerySchema::default(),
            origin: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, field: QueryField) -> Self {
        self.query.insert(key, field);
        self
    }

    pub fn origin(mut self, tag: impl Into<String>) -> Self {
        self.origin = Some(tag.into());
        self
    }
}

/// 别名模板的注册声明。
///
/// `rename`：canonical 参数名 -> 别名参数名；
/// `fixed`：canonical 参数名 -> 固定值。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasSpec {
    pub pattern: String,
    pub target: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub fixed: BTreeMap<String, String>,
    #[serde(default)]
    pub origin: Option<String>,
}

impl AliasSpec {
    pub fn new(pattern: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            target: target.into(),
            name: None,
            rename: BTreeMap::new(),
            fixed: BTreeMap::new(),
            origin: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn rename(mut self, canonical: impl Into<String>, alias: impl Into<String>) -> Self {
        self.rename.insert(canonical.into(), alias.into());
        self
    }

    pub fn fixed(mut self, canonical: impl Into<String>, value: impl Into<String>) -> Self {
        self.fixed.insert(canonical.into(), value.into());
        self
    }

    pub fn origin(mut self, tag: impl Into<String>) -> Self {
        self.origin = Some(tag.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum TemplateSpec {
    Canonical(CanonicalSpec),
    Alias(AliasSpec),
}

impl TemplateSpec {
    pub fn pattern(&self) -> &str {
        match self {
            TemplateSpec::Canonical(spec) => &spec.pattern,
            TemplateSpec::Alias(spec) => &spec.pattern,
        }
    }
}

impl From<CanonicalSpec> for TemplateSpec {
    fn from(spec: CanonicalSpec) -> Self {
        TemplateSpec::Canonical(spec)
    }
}

impl From<AliasSpec> for TemplateSpec {
    fn from(spec: AliasSpec) -> Self {
        TemplateSpec::Alias(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_leading_slash_and_keeps_trailing() {
        let pattern = PathPattern::parse("/issue/").unwrap();
        assert_eq!(pattern.as_str(), "issue/");
        assert!(pattern.has_trailing_slash());
        assert_eq!(pattern.segments(), &[Segment::Literal("issue".into())]);
        assert_eq!(pattern.skeleton(), "/issue/");
    }

    #[test]
    fn skeleton_ignores_parameter_names() {
        let by_id = PathPattern::parse("t/{treeId}").unwrap();
        let by_test = PathPattern::parse("t/{testId}").unwrap();
        assert_eq!(by_id.skeleton(), by_test.skeleton());

        let hash = PathPattern::parse("tree/{treeName}/{branch}/{hash}").unwrap();
        assert_eq!(hash.skeleton(), "/tree/{p0}/{p1}/{p2}");
        assert_eq!(hash.params().collect::<Vec<_>>(), ["treeName", "branch", "hash"]);
    }

    #[test]
    fn parse_rejects_malformed_patterns() {
        for bad in ["", "/", "tree//x", "tree/{1abc}", "a/{x}/{x}", "a/b{c", "a/?q"] {
            assert!(
                matches!(PathPattern::parse(bad), Err(CatalogError::InvalidPattern { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn build_encodes_params_and_query() {
        let pattern = PathPattern::parse("tree/{treeName}/{branch}").unwrap();
        let params = PathParams::from([
            ("treeName".to_owned(), "linux next".to_owned()),
            ("branch".to_owned(), "for/6.9".to_owned()),
        ]);
        let query = QueryPairs::from([("tab", "boots"), ("label", "a b"), ("label", "c&d")]);
        assert_eq!(
            pattern.build(&params, &query).unwrap(),
            "/tree/linux%20next/for%2F6.9?tab=boots&label=a+b&label=c%26d"
        );
    }

    #[test]
    fn build_reports_missing_param() {
        let pattern = PathPattern::parse("build/{buildId}").unwrap();
        let err = pattern.build(&PathParams::new(), &QueryPairs::new()).unwrap_err();
        assert_eq!(
            err,
            LinkError::MissingParam {
                pattern: "build/{buildId}".into(),
                param: "buildId".into(),
            }
        );
    }
}
