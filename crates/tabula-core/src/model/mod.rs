//! Module: model
//!
//! Backend-agnostic metadata shared by both handler families. Built once by
//! the catalog at handler construction and read-only afterwards.

mod catalog;
mod column;
mod navigation;
mod table;

pub use catalog::{Catalog, PrimaryKeySet};
pub use column::DataColumn;
pub use navigation::{KeyPair, NavigationEdge};
pub use table::TableMetadata;
