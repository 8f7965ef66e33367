use std::fmt;

use crate::dashroute_core::error::LinkError;
use crate::dashroute_core::route::{Catalog, RouteTemplate};
use crate::dashroute_core::types::{CanonicalParams, PathParams, QueryPairs, ResourceKind};

/// 某一资源的来源族（origin family）。
///
/// 每种资源一个封闭枚举；`Default` 是「裸」族，即没有 origin 时的行为。
/// 页面只用它来挑选自己生成链接时的模板，不能用它改变展示的资源。
pub trait OriginFamily: Copy + Default + PartialEq + fmt::Debug + 'static {
    const RESOURCE: ResourceKind;

    /// 其它资源的 origin 视为缺失。
    fn from_origin(origin: Origin) -> Option<Self>;

    fn into_origin(self) -> Origin;

    /// 路由表里使用的标签，例如 "checkout-alias"。
    fn tag(self) -> &'static str;

    fn parse(tag: &str) -> Option<Self>;

    /// 该族自己生成链接时使用的模板。
    fn link_pattern(self) -> &'static str;
}

macro_rules! origin_family {
    (
        $(#[$meta:meta])*
        $family:ident for $resource:ident {
            $default:ident => ($default_tag:literal, $default_link:literal),
            $($variant:ident => ($tag:literal, $link:literal),)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub enum $family {
            #[default]
            $default,
            $($variant,)*
        }

        impl OriginFamily for $family {
            const RESOURCE: ResourceKind = ResourceKind::$resource;

            fn from_origin(origin: Origin) -> Option<Self> {
                match origin {
                    Origin::$resource(family) => Some(family),
                    _ => None,
                }
            }

            fn into_origin(self) -> Origin {
                Origin::$resource(self)
            }

            fn tag(self) -> &'static str {
                match self {
                    $family::$default => $default_tag,
                    $($family::$variant => $tag,)*
                }
            }

            fn parse(tag: &str) -> Option<Self> {
                match tag {
                    $default_tag => Some($family::$default),
                    $($tag => Some($family::$variant),)*
                    _ => None,
                }
            }

            fn link_pattern(self) -> &'static str {
                match self {
                    $family::$default => $default_link,
                    $($family::$variant => $link,)*
                }
            }
        }
    };
}

origin_family! {
    /// tree 页面的来源族。
    ///
    /// 标识符寻址（快照）与 name+branch 寻址（分支最新）是两个独立的
    /// canonical 族，彼此之间不互相重定向。
    TreeFamily for Tree {
        Identifier => ("identifier", "tree/{treeId}"),
        NameBranch => ("name-branch", "tree/{treeName}/{branch}"),
        NameBranchHash => ("name-branch-hash", "tree/{treeName}/{branch}/{hash}"),
        CheckoutAlias => ("checkout-alias", "c/{treeName}/{branch}"),
    }
}

origin_family! {
    IssueFamily for Issue {
        Identifier => ("identifier", "issue/{issueId}"),
        Versioned => ("versioned", "issue/{issueId}/version/{versionNumber}"),
    }
}

origin_family! {
    TestFamily for Test {
        Identifier => ("identifier", "test/{testId}"),
    }
}

origin_family! {
    BuildFamily for Build {
        Identifier => ("identifier", "build/{buildId}"),
    }
}

origin_family! {
    HardwareFamily for Hardware {
        Identifier => ("identifier", "hardware/{hardwareId}"),
    }
}

/// 挂在 canonical 导航上的来源提示。
///
/// 不属于资源身份的一部分：同一资源无论带什么 origin 都渲染同一份内容。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Tree(TreeFamily),
    Test(TestFamily),
    Issue(IssueFamily),
    Build(BuildFamily),
    Hardware(HardwareFamily),
}

impl Origin {
    /// 按资源类型解析标签；不属于该资源封闭集合的标签返回 None。
    pub fn parse(resource: ResourceKind, tag: &str) -> Option<Origin> {
        match resource {
            ResourceKind::Tree => TreeFamily::parse(tag).map(Origin::Tree),
            ResourceKind::Test => TestFamily::parse(tag).map(Origin::Test),
            ResourceKind::Issue => IssueFamily::parse(tag).map(Origin::Issue),
            ResourceKind::Build => BuildFamily::parse(tag).map(Origin::Build),
            ResourceKind::Hardware => HardwareFamily::parse(tag).map(Origin::Hardware),
        }
    }

    pub fn resource(self) -> ResourceKind {
        match self {
            Origin::Tree(_) => ResourceKind::Tree,
            Origin::Test(_) => ResourceKind::Test,
            Origin::Issue(_) => ResourceKind::Issue,
            Origin::Build(_) => ResourceKind::Build,
            Origin::Hardware(_) => ResourceKind::Hardware,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Origin::Tree(family) => family.tag(),
            Origin::Test(family) => family.tag(),
            Origin::Issue(family) => family.tag(),
            Origin::Build(family) => family.tag(),
            Origin::Hardware(family) => family.tag(),
        }
    }

    pub fn link_pattern(self) -> &'static str {
        match self {
            Origin::Tree(family) => family.link_pattern(),
            Origin::Test(family) => family.link_pattern(),
            Origin::Issue(family) => family.link_pattern(),
            Origin::Build(family) => family.link_pattern(),
            Origin::Hardware(family) => family.link_pattern(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource(), self.tag())
    }
}

/// canonical 页面渲染时拿到的全部输入。
///
/// 这是本层对页面组件暴露的唯一接口：解析好的 path 参数、应用过
/// schema 的 query，以及（可选的）来源族。
#[derive(Debug, Clone)]
pub struct RenderInput<'c, F: OriginFamily> {
    pub template: &'c RouteTemplate,
    pub params: PathParams,
    pub query: CanonicalParams,
    pub origin: Option<F>,
}

impl<F: OriginFamily> RenderInput<'_, F> {
    /// 没有 origin 时回落到裸族。
    pub fn family(&self) -> F {
        self.origin.unwrap_or_default()
    }

    /// 按当前来源族构造页面内部链接（翻页、切 tab、「最新」等）。
    pub fn link(
        &self,
        catalog: &Catalog,
        params: &PathParams,
        query: &QueryPairs,
    ) -> Result<String, LinkError> {
        catalog.href(self.family().link_pattern(), params, query)
    }
}

/// canonical 页面组件的渲染契约。
///
/// 页面本身（内容渲染、数据获取）不在本层范围内。
pub trait Page {
    type Family: OriginFamily;
    type Output;

    fn render(&self, input: RenderInput<'_, Self::Family>) -> Self::Output;
}
