use std::ops::{BitAnd, BitOr};

///
/// Predicate AST
///
/// Pure, backend-agnostic representation of a `$filter` expression.
/// Literals are carried in their normalized string encoding and are only
/// marshalled (against the referenced column's type) during rendering.
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    /// Operator name as spelled in a filter expression.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Lte => "le",
            Self::Gt => "gt",
            Self::Gte => "ge",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }

    /// Binary comparison symbol shared by every dialect.
    #[must_use]
    pub const fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Ne => Some("<>"),
            Self::Lt => Some("<"),
            Self::Lte => Some("<="),
            Self::Gt => Some(">"),
            Self::Gte => Some(">="),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_text_match(self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }
}

///
/// Literal
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Literal {
    Null,
    Value(String),
    List(Vec<String>),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparePredicate {
    pub field: String,
    pub op: CompareOp,
    pub value: Literal,
}

impl ComparePredicate {
    pub fn new(field: impl Into<String>, op: CompareOp, value: Literal) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

///
/// Predicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparePredicate),
    IsNull { field: String },
}

impl Predicate {
    #[must_use]
    pub const fn and(preds: Vec<Self>) -> Self {
        Self::And(preds)
    }

    #[must_use]
    pub const fn or(preds: Vec<Self>) -> Self {
        Self::Or(preds)
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(pred: Self) -> Self {
        Self::Not(Box::new(pred))
    }

    fn compare(field: impl Into<String>, op: CompareOp, value: Literal) -> Self {
        Self::Compare(ComparePredicate::new(field, op, value))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::compare(field, CompareOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::compare(field, CompareOp::Ne, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::compare(field, CompareOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::compare(field, CompareOp::Lte, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::compare(field, CompareOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::compare(field, CompareOp::Gte, value.into())
    }

    pub fn in_<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::compare(field, CompareOp::In, Literal::List(values))
    }

    pub fn not_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::compare(field, CompareOp::NotIn, Literal::List(values))
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::Contains, Literal::Value(value.into()))
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::StartsWith, Literal::Value(value.into()))
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::EndsWith, Literal::Value(value.into()))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}
