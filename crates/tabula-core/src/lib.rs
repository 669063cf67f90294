//! Core runtime for Tabula: catalog introspection, value marshalling, query
//! translation, transactions, and the backend handlers exported via the
//! `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod cache;
pub mod driver;
pub mod error;
pub mod handler;
pub mod model;
pub mod obs;
pub mod query;
pub mod record;
pub mod txn;
pub mod value;

pub(crate) mod catalog;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::InternalError as Error;

///
/// Prelude
///
/// Vocabulary needed to build a handler and issue record operations.
/// Drivers, caches and translators stay behind their modules.
///

pub mod prelude {
    pub use crate::{
        error::{ErrorClass, InternalError},
        handler::DataHandler,
        model::{NavigationEdge, TableMetadata},
        query::{Direction, OrderItem, Predicate, QueryOptions},
        record::{ETag, Record},
        txn::TxContext,
    };
    pub use tabula_config::{HandlerConfig, TableConfig};
    pub use tabula_primitives::DataType;
}
