mod meta;
mod resolved;
mod store;
mod table;

pub use meta::*;
pub use resolved::*;
pub use store::*;
pub use table::*;
