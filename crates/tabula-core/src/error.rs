use crate::driver::DriverError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// The single checked fault surfaced by every handler operation.
/// `class` is the stable fault taxonomy; `origin` names the subsystem that
/// raised it. Nothing in the engine retries on any class.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Underlying backend cause, when one exists.
    #[source]
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach the driver failure that caused this fault.
    #[must_use]
    pub fn with_cause(mut self, cause: DriverError) -> Self {
        self.detail = Some(ErrorDetail::Driver(cause));
        self
    }

    /// Catalog introspection failed; the handler cannot be built.
    pub(crate) fn catalog(message: impl Into<String>, cause: DriverError) -> Self {
        let message = message.into();
        Self::new(
            ErrorClass::Catalog,
            ErrorOrigin::Catalog,
            format!("{message}: {cause}"),
        )
        .with_cause(cause)
    }

    /// Connection/session acquisition or statement execution failed.
    pub(crate) fn connectivity(
        origin: ErrorOrigin,
        message: impl Into<String>,
        cause: DriverError,
    ) -> Self {
        let message = message.into();
        Self::new(
            ErrorClass::Connectivity,
            origin,
            format!("{message}: {cause}"),
        )
        .with_cause(cause)
    }

    /// A requested option cannot be rendered for this backend.
    pub(crate) fn query_generation(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::QueryGeneration, ErrorOrigin::Query, message)
    }

    /// The operation or construct is not offered by this backend.
    pub(crate) fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, origin, message)
    }

    /// A value could not be converted between its normalized and native form.
    pub(crate) fn binding(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Binding, ErrorOrigin::Marshal, message)
    }

    pub(crate) fn not_found(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, origin, message)
    }

    pub(crate) fn invariant(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, origin, message)
    }

    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self.class, ErrorClass::Unsupported)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured cause carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Driver(DriverError),
}

///
/// ErrorClass
/// Fault taxonomy surfaced to callers.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Catalog,
    Connectivity,
    QueryGeneration,
    Unsupported,
    Binding,
    NotFound,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Catalog => "catalog",
            Self::Connectivity => "connectivity",
            Self::QueryGeneration => "query_generation",
            Self::Unsupported => "unsupported",
            Self::Binding => "binding",
            Self::NotFound => "not_found",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Subsystem that raised the fault.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Catalog,
    Marshal,
    Query,
    Cache,
    Transaction,
    Handler,
    Reference,
    Driver,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Catalog => "catalog",
            Self::Marshal => "marshal",
            Self::Query => "query",
            Self::Cache => "cache",
            Self::Transaction => "transaction",
            Self::Handler => "handler",
            Self::Reference => "reference",
            Self::Driver => "driver",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

impl From<tabula_config::ConfigError> for InternalError {
    fn from(err: tabula_config::ConfigError) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Config, err.to_string())
    }
}

///
/// TESTS
///
