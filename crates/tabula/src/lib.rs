//! ## Crate layout
//! - `config`: handler configuration document and TOML loading.
//! - `core`: catalog, marshalling, query translation, transactions and the
//!   backend handlers.
//! - `primitives`: the normalized data-type vocabulary.
//!
//! The `prelude` module mirrors the surface a protocol layer needs to build
//! a handler and issue record operations.

pub use tabula_config as config;
pub use tabula_core as core;
pub use tabula_primitives as primitives;

pub use tabula_core::Error;

use std::sync::Arc;
use tabula_config::HandlerConfig;
use tabula_core::{
    driver::{ConnectionSource, CqlSession},
    handler::DataHandler,
};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use tabula_core::prelude::*;
}

/// Relational handler from a TOML configuration document.
pub fn rdbms_from_toml(
    config: &str,
    source: Arc<dyn ConnectionSource>,
) -> Result<DataHandler, Error> {
    let config = HandlerConfig::from_toml_str(config)?;

    DataHandler::rdbms(config, source)
}

/// Column-family handler from a TOML configuration document. The document
/// must name a `keyspace`.
pub fn column_family_from_toml(
    config: &str,
    session: Arc<dyn CqlSession>,
) -> Result<DataHandler, Error> {
    let config = HandlerConfig::from_toml_str(config)?;

    DataHandler::column_family(config, session)
}

///
/// TESTS
///
