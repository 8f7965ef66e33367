use thiserror::Error;

/// 注册期（进程启动期）错误。
///
/// 任何一个都是致命的：Catalog 不会在不一致的状态下被 freeze 出来。
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("route pattern `{pattern}` is already registered")]
    DuplicatePattern { pattern: String },

    #[error("alias `{alias}` has an invalid parameter mapping: {reason}")]
    InvalidAliasMapping { alias: String, reason: String },

    #[error("route pattern `{pattern}` is ambiguous with `{existing}`")]
    AmbiguousRoute { pattern: String, existing: String },

    #[error("template name `{name}` on `{pattern}` is already used by `{existing}`")]
    DuplicateName {
        name: String,
        pattern: String,
        existing: String,
    },

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid query schema on `{pattern}` for key `{key}`: {reason}")]
    InvalidQuerySchema {
        pattern: String,
        key: String,
        reason: String,
    },

    #[error("origin tag `{tag}` on `{pattern}` is not a {resource} family")]
    InvalidOrigin {
        pattern: String,
        resource: String,
        tag: String,
    },

    #[error("route table error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("a route catalog is already installed")]
    AlreadyInstalled,
}

/// 导航期错误。
///
/// 解析是确定性的纯函数，重试不会改变结果，所以这里没有任何重试语义。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("no route matches `{path}`")]
    NoMatch { path: String },

    #[error("alias `{alias}` cannot satisfy parameter `{param}` of `{target}`")]
    UnsatisfiableAlias {
        alias: String,
        target: String,
        param: String,
    },
}

/// 导航失败时交给渲染侧的错误视图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorView {
    /// 通用的「资源不存在」页面，用户可以自行导航离开。
    NotFound { path: String },

    /// 别名与 canonical 目标之间的配置缺陷。
    ConfigurationDefect { message: String },
}

impl NavigationError {
    pub fn view(&self) -> ErrorView {
        match self {
            NavigationError::NoMatch { path } => ErrorView::NotFound { path: path.clone() },
            NavigationError::UnsatisfiableAlias { .. } => ErrorView::ConfigurationDefect {
                message: self.to_string(),
            },
        }
    }
}

/// 链接构造错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("no route template with pattern `{pattern}`")]
    UnknownPattern { pattern: String },

    #[error("missing value for `{param}` when building `{pattern}`")]
    MissingParam { pattern: String, param: String },
}
