//! Module: query
//!
//! Query-option model, predicate AST, dialect descriptors and the
//! translator that turns them into statement text plus bound values.

mod dialect;
mod options;
mod predicate;
mod render;
mod translator;
mod write;


pub use dialect::Dialect;
pub use options::{Direction, OrderItem, QueryOptions};
pub use predicate::{CompareOp, ComparePredicate, Literal, Predicate};
pub use translator::{QueryTranslator, SelectPlan};

use crate::value::NativeValue;
use std::fmt;

///
/// Statement
///
/// Fully built statement: text with positional `?` placeholders and the
/// values bound to them, already marshalled.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<NativeValue>,
}

impl Statement {
    #[must_use]
    pub const fn new(text: String, params: Vec<NativeValue>) -> Self {
        Self { text, params }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
