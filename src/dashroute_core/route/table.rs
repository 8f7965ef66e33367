use serde::Deserialize;

use super::meta::{AliasSpec, CanonicalSpec};
use super::store::{Catalog, CatalogBuilder};
use crate::dashroute_core::error::CatalogError;

/// 内置的看板路由表。
const DASHBOARD_ROUTES: &str = include_str!("dashboard.toml");

/// 数据驱动的路由表声明（TOML）。
///
/// 所有 canonical 先于所有别名注册，满足注册顺序的前置条件。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTable {
    #[serde(default)]
    pub canonical: Vec<CanonicalSpec>,

    #[serde(default)]
    pub alias: Vec<AliasSpec>,
}

impl RouteTable {
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(text)?)
    }

    pub fn dashboard() -> Result<Self, CatalogError> {
        Self::from_toml(DASHBOARD_ROUTES)
    }

    pub fn into_catalog(self) -> Result<Catalog, CatalogError> {
        let mut builder = CatalogBuilder::new();
        builder.register_table(self)?;
        Ok(builder.freeze())
    }
}

impl CatalogBuilder {
    pub fn register_table(&mut self, table: RouteTable) -> Result<(), CatalogError> {
        for spec in table.canonical {
            self.register(spec)?;
        }
        for spec in table.alias {
            self.register(spec)?;
        }
        Ok(())
    }
}

impl Catalog {
    /// 构建内置看板路由表对应的 Catalog。
    pub fn dashboard() -> Result<Catalog, CatalogError> {
        RouteTable::dashboard()?.into_catalog()
    }
}
