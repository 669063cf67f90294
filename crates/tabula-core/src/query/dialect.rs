use crate::error::InternalError;
use std::{borrow::Cow, fmt, fmt::Write as _};

///
/// Dialect
///
/// Rendering strategy for identifiers, pagination and predicate syntax.
/// Relational dialects are detected once from the backend product name;
/// the column-family backend always renders [`Dialect::Cql`].
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Dialect {
    /// MySQL / PostgreSQL style `LIMIT m OFFSET n`.
    Generic,
    /// Generic, except that an offset without a limit renders `LIMIT -1`.
    Sqlite,
    Oracle,
    SqlServer,
    Cql,
}

impl Dialect {
    /// Pick the relational dialect for a database product name.
    pub fn detect(product_name: &str) -> Result<Self, InternalError> {
        let product = product_name.trim().to_ascii_lowercase();

        match product.as_str() {
            p if p.contains("oracle") => Ok(Self::Oracle),
            "microsoft sql server" => Ok(Self::SqlServer),
            "mysql" | "postgresql" => Ok(Self::Generic),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(InternalError::query_generation(format!(
                "database type not supported: '{product_name}'"
            ))),
        }
    }

    #[must_use]
    pub const fn is_cql(self) -> bool {
        matches!(self, Self::Cql)
    }

    /// Identifier as written in statement text. Column-family identifiers
    /// are quoted to preserve case; relational identifiers are left bare.
    #[must_use]
    pub fn quote(self, ident: &str) -> Cow<'_, str> {
        if self.is_cql() {
            Cow::Owned(format!("\"{}\"", ident.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(ident)
        }
    }

    /// Append the pagination clause. `limit == 0` means no limit.
    /// SQL Server requires an order clause for offset paging, so one is
    /// synthesized when `has_order` is false.
    pub(crate) fn paginate(self, out: &mut String, has_order: bool, limit: u64, offset: u64) {
        match self {
            Self::Oracle => {
                if limit != 0 {
                    if offset != 0 {
                        let _ = write!(out, " OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY");
                    } else {
                        let _ = write!(out, " FETCH FIRST {limit} ROWS ONLY");
                    }
                } else if offset != 0 {
                    let _ = write!(out, " OFFSET {offset} ROWS");
                }
            }
            Self::SqlServer => {
                if !has_order {
                    out.push_str(" ORDER BY (SELECT 1)");
                }
                let _ = write!(out, " OFFSET {offset} ROWS");
                if limit != 0 {
                    let _ = write!(out, " FETCH NEXT {limit} ROWS ONLY");
                }
            }
            Self::Generic | Self::Sqlite => {
                if limit != 0 {
                    let _ = write!(out, " LIMIT {limit}");
                    if offset != 0 {
                        let _ = write!(out, " OFFSET {offset}");
                    }
                } else if offset != 0 {
                    if self == Self::Sqlite {
                        out.push_str(" LIMIT -1");
                    }
                    let _ = write!(out, " OFFSET {offset}");
                }
            }
            Self::Cql => {
                if limit != 0 {
                    let _ = write!(out, " LIMIT {limit}");
                }
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generic => "generic",
            Self::Sqlite => "sqlite",
            Self::Oracle => "oracle",
            Self::SqlServer => "sqlserver",
            Self::Cql => "cql",
        })
    }
}
