//! 看板前端的路由别名解析与规范化层。
//!
//! - [`Catalog`]：路由模板表（canonical + 别名），启动时构建一次后只读
//! - [`AliasResolver`]：别名 -> canonical 的一跳重定向
//! - [`Page`] / [`RenderInput`]：把来源族传给 canonical 页面的渲染契约
//! - [`Navigator`]：把以上三者串起来，对接外部的 [`NavigationHost`]

mod dashroute_core;

pub use dashroute_core::*;
