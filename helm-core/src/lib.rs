mod as_value;
mod condition;
mod cursor;
mod delegator;
mod entity;
mod entity_value;
mod error;
mod field;
mod find_options;
mod helper;
mod order_by;
mod query;
mod registry;
mod relation;
pub mod schema;
mod util;
mod value;
mod view;
pub mod writer;

pub use ::anyhow::Context;
pub use as_value::*;
pub use condition::*;
pub use cursor::*;
pub use delegator::*;
pub use entity::*;
pub use entity_value::*;
pub use error::*;
pub use field::*;
pub use find_options::*;
pub use helper::*;
pub use order_by::*;
pub use query::*;
pub use registry::*;
pub use relation::*;
pub use util::*;
pub use value::*;
pub use view::*;
pub use writer::{Fragment, GenericSqlWriter, SqlWriter};
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::async_trait::async_trait;
pub use ::futures::future;

pub type Result<T> = std::result::Result<T, Error>;
