//! 内置路由表上的性质验证。
//!
//! - 幂等：canonical 导航永远不产生重定向
//! - 无链：任何别名的重定向目标都是 canonical
//! - 参数保真：重定向后的 canonical 参数等于别名值按声明改名的结果
//! - query 保真：重定向指令里的 query 与输入完全相同（含重复 key 与顺序），
//!   与 canonical schema 无关

use std::sync::OnceLock;

use dashroute::{
    AliasResolver, Catalog, ParamSource, PathParams, QueryPairs, ResolvedNavigation, RouteTemplate,
    TemplateRole,
};
use proptest::prelude::*;

fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| Catalog::dashboard().expect("dashboard table is valid"))
}

fn param_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-][a-zA-Z0-9 ._%-]{0,11}"
}

/// key 取自很小的字母表，保证经常出现重复 key。
fn query_pairs() -> impl Strategy<Value = QueryPairs> {
    prop::collection::vec(("[a-c]{1,2}", "[a-zA-Z0-9 &=+%é]{0,8}"), 0..6)
        .prop_map(|pairs| pairs.into_iter().collect())
}

/// 随机挑一个模板，并为它的每个参数生成值。
fn navigation(
    canonical: bool,
) -> impl Strategy<Value = (&'static RouteTemplate, PathParams, QueryPairs)> {
    let templates: Vec<&'static RouteTemplate> = catalog()
        .templates()
        .iter()
        .filter(|template| template.is_canonical() == canonical)
        .collect();
    prop::sample::select(templates).prop_flat_map(|template| {
        let names: Vec<String> = template.pattern.params().map(str::to_owned).collect();
        let values = prop::collection::vec(param_value(), names.len());
        (Just(template), values, query_pairs()).prop_map(move |(template, values, query)| {
            let params = names.iter().cloned().zip(values).collect();
            (template, params, query)
        })
    })
}

#[test]
fn every_alias_targets_a_canonical_of_the_same_resource() {
    for template in catalog().templates() {
        let TemplateRole::Alias { target, .. } = &template.role else {
            continue;
        };
        let target = catalog().get(*target).expect("alias target is registered");
        assert!(target.is_canonical(), "{} chains to an alias", template.pattern.as_str());
        assert_eq!(target.resource, template.resource);
    }
}

proptest! {
    #[test]
    fn alias_redirects_preserve_params_and_query((alias, params, query) in navigation(false)) {
        let url = catalog().href(alias.pattern.as_str(), &params, &query).unwrap();
        let nav = catalog().lookup(&url).unwrap();
        prop_assert_eq!(nav.id, alias.id);
        prop_assert_eq!(&nav.path_params, &params);
        prop_assert_eq!(&nav.query, &query);

        let resolver = AliasResolver::new(catalog());
        let redirect = resolver.resolve(&nav).unwrap().expect("aliases always redirect");
        prop_assert!(redirect.target.is_canonical());
        prop_assert_eq!(&redirect.query, &query);

        let TemplateRole::Alias { mapping, .. } = &alias.role else {
            unreachable!("navigation(false) only yields aliases");
        };
        prop_assert_eq!(redirect.params.len(), mapping.iter().count());
        for (canonical_param, source) in mapping.iter() {
            let expected = match source {
                ParamSource::Rename(alias_param) => &params[alias_param],
                ParamSource::Fixed(value) => value,
            };
            prop_assert_eq!(&redirect.params[canonical_param], expected);
        }

        let settled = ResolvedNavigation::new(
            redirect.target,
            redirect.params.clone(),
            redirect.query.clone(),
        );
        prop_assert!(resolver.resolve(&settled).unwrap().is_none());
    }

    #[test]
    fn canonical_navigation_never_redirects((template, params, query) in navigation(true)) {
        let url = catalog().href(template.pattern.as_str(), &params, &query).unwrap();
        let nav = catalog().lookup(&url).unwrap();
        prop_assert_eq!(nav.id, template.id);
        prop_assert!(AliasResolver::new(catalog()).resolve(&nav).unwrap().is_none());
    }

    #[test]
    fn redirect_query_is_independent_of_the_schema(
        query in prop::collection::vec((".{0,8}", ".{0,8}"), 0..6)
            .prop_map(|pairs| pairs.into_iter().collect::<QueryPairs>()),
        tree_id in param_value(),
    ) {
        let alias = catalog().by_pattern("t/{treeId}").unwrap();
        let nav = ResolvedNavigation::new(
            alias,
            PathParams::from([("treeId".to_owned(), tree_id.clone())]),
            query.clone(),
        );
        let redirect = AliasResolver::new(catalog()).resolve(&nav).unwrap().unwrap();
        prop_assert_eq!(redirect.query, query);
        prop_assert_eq!(&redirect.params["treeId"], &tree_id);
    }
}
