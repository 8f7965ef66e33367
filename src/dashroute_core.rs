mod alias;
mod error;
mod navigation;
mod origin;
mod query;
mod route;
mod types;

pub use alias::*;
pub use error::*;
pub use navigation::*;
pub use origin::*;
pub use query::*;
pub use route::*;
pub use types::*;
