use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::dashroute_core::error::CatalogError;
use crate::dashroute_core::types::{CanonicalParams, QueryPairs};

/// canonical 模板上单个 query key 的声明：类型 + 可选默认值。
///
/// 在路由表里写作：
///
/// ```toml
/// [canonical.query]
/// tab = { type = "one-of", values = ["builds", "boots", "tests"], default = "builds" }
/// page = { type = "integer", min = 1, default = 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QueryField {
    Text {
        #[serde(default)]
        default: Option<String>,
    },
    Integer {
        #[serde(default)]
        default: Option<i64>,
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    Flag {
        #[serde(default)]
        default: Option<bool>,
    },
    OneOf {
        values: Vec<String>,
        #[serde(default)]
        default: Option<String>,
    },
}

impl QueryField {
    pub fn text() -> Self {
        QueryField::Text { default: None }
    }

    pub fn integer(default: i64) -> Self {
        QueryField::Integer {
            default: Some(default),
            min: None,
            max: None,
        }
    }

    pub fn flag(default: bool) -> Self {
        QueryField::Flag {
            default: Some(default),
        }
    }

    pub fn one_of<I, S>(values: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryField::OneOf {
            values: values.into_iter().map(Into::into).collect(),
            default: Some(default.into()),
        }
    }

    /// 把原始字符串转换为声明的类型；不合法返回 None。
    fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            QueryField::Text { .. } => Some(Value::String(raw.to_owned())),
            QueryField::Integer { min, max, .. } => {
                let n: i64 = raw.trim().parse().ok()?;
                let in_range = min.is_none_or(|min| n >= min) && max.is_none_or(|max| n <= max);
                in_range.then(|| Value::from(n))
            }
            QueryField::Flag { .. } => match raw {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            QueryField::OneOf { values, .. } => values
                .iter()
                .any(|value| value == raw)
                .then(|| Value::String(raw.to_owned())),
        }
    }

    fn default_value(&self) -> Option<Value> {
        match self {
            QueryField::Text { default } => default.clone().map(Value::String),
            QueryField::Integer { default, .. } => default.map(Value::from),
            QueryField::Flag { default } => default.map(Value::Bool),
            QueryField::OneOf { default, .. } => default.clone().map(Value::String),
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            QueryField::Integer {
                default,
                min,
                max,
            } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(format!("min {min} is greater than max {max}"));
                    }
                }
                match default {
                    Some(n) if min.is_some_and(|min| *n < min) => {
                        Err(format!("default {n} is below min"))
                    }
                    Some(n) if max.is_some_and(|max| *n > max) => {
                        Err(format!("default {n} is above max"))
                    }
                    _ => Ok(()),
                }
            }
            QueryField::OneOf { values, default } => {
                if values.is_empty() {
                    return Err("one-of needs at least one value".to_owned());
                }
                match default {
                    Some(d) if !values.contains(d) => {
                        Err(format!("default `{d}` is not one of the values"))
                    }
                    _ => Ok(()),
                }
            }
            QueryField::Text { .. } | QueryField::Flag { .. } => Ok(()),
        }
    }
}

/// canonical 模板的 query schema：key -> 声明。
///
/// 只在重定向完成之后、进入 canonical 模板时应用；别名阶段的 query
/// 原样透传，不经过这里。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct QuerySchema {
    fields: BTreeMap<String, QueryField>,
}

impl QuerySchema {
    pub fn insert(&mut self, key: impl Into<String>, field: QueryField) {
        self.fields.insert(key.into(), field);
    }

    pub fn field(&self, key: &str) -> Option<&QueryField> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn validate(&self, pattern: &str) -> Result<(), CatalogError> {
        for (key, field) in &self.fields {
            field.check().map_err(|reason| CatalogError::InvalidQuerySchema {
                pattern: pattern.to_owned(),
                key: key.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    /// 应用 schema：
    ///
    /// - 缺失的 key 使用默认值（没有默认值则不出现）
    /// - 不合法的值退回默认值，不让导航失败
    /// - schema 未声明的 key 以字符串原样保留
    /// - 重复出现的 key 取最后一个值
    pub fn apply(&self, raw: &QueryPairs) -> CanonicalParams {
        let mut map = BTreeMap::new();

        for (key, field) in &self.fields {
            let value = match raw.get(key) {
                Some(text) => field.coerce(text).or_else(|| {
                    warn!(
                        key = %key,
                        value = %text,
                        "query value rejected by schema, using default"
                    );
                    field.default_value()
                }),
                None => field.default_value(),
            };
            if let Some(value) = value {
                map.insert(key.clone(), value);
            }
        }

        for (key, text) in raw.iter() {
            if !self.fields.contains_key(key) {
                map.insert(key.to_owned(), Value::String(text.to_owned()));
            }
        }

        CanonicalParams { map }
    }
}
