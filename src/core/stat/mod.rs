//! The `stat` mod keeps the invocation statistics of every dimension,
//! and the factory publishing changes of the stat set.

mod dimension;
mod factory;
mod invocation_stat;

pub use dimension::*;
pub use factory::*;
pub use invocation_stat::*;
