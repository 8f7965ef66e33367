use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// 路由模板在 Catalog 内部的标识。
///
/// 数值就是模板在 `Catalog::templates` 中的下标，注册顺序决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub u32);

/// path 参数：参数名 -> 原始字符串值。
///
/// 例如 `tree/{treeId}` 命中 `tree/7f3a` 后得到 `treeId -> "7f3a"`。
pub type PathParams = BTreeMap<String, String>;

/// query 参数：按出现顺序保存的原始 key/value 对，尚未经过任何 schema 校验。
///
/// 同一个 key 可以出现多次（`?search=a&search=b`），重定向时整体原样透传；
/// 只有 canonical schema 应用时才收敛成单值。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// key 最后一次出现的值。
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// key 的全部值，按出现顺序。
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryPairs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for QueryPairs {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// 路由模板所指向的资源类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Tree,
    Test,
    Issue,
    Build,
    Hardware,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Tree => "tree",
            ResourceKind::Test => "test",
            ResourceKind::Issue => "issue",
            ResourceKind::Build => "build",
            ResourceKind::Hardware => "hardware",
        };
        f.write_str(name)
    }
}

/// 规范化参数：
///
/// 代表 canonical 模板的 query schema 应用之后的类型化视图。
/// 使用 serde_json::Value 承载整数 / 布尔 / 字符串等不同类型。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalParams {
    pub map: BTreeMap<String, Value>,
}

impl CanonicalParams {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.map.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).and_then(Value::as_bool)
    }
}
