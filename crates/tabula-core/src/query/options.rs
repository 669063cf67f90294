use super::predicate::Predicate;
use std::fmt;

///
/// Direction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

///
/// OrderItem
///
/// One `$orderby` entry. An unspecified direction renders the bare column
/// and leaves the backend default (ascending) in effect.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderItem {
    pub column: String,
    pub direction: Option<Direction>,
}

impl OrderItem {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: None,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(Direction::Asc),
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(Direction::Desc),
        }
    }
}

///
/// QueryOptions
///
/// Normalized query-option set parsed by the protocol layer. Every option
/// is optional; an absent option has no effect on the generated statement.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    /// Requested columns. `*` anywhere in the list selects every column.
    pub select: Option<Vec<String>>,
    pub filter: Option<Predicate>,
    pub order_by: Vec<OrderItem>,

    /// Page size. Absent means the configured maximum page size; zero
    /// means no limit clause at all.
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: Option<bool>,

    /// Raw `$expand` text. Never executed; its presence is rejected.
    pub expand: Option<String>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    #[must_use]
    pub fn order_by(mut self, item: OrderItem) -> Self {
        self.order_by.push(item);
        self
    }

    #[must_use]
    pub const fn top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub const fn count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    /// True only when the caller explicitly asked for a count.
    #[must_use]
    pub fn count_requested(&self) -> bool {
        self.count == Some(true)
    }

    #[must_use]
    pub fn skip_or_zero(&self) -> u64 {
        self.skip.unwrap_or(0)
    }
}
