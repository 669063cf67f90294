//! Predicate visitor: renders a [`Predicate`] tree into dialect text plus
//! positional bound values.

use super::{
    dialect::Dialect,
    options::OrderItem,
    predicate::{CompareOp, ComparePredicate, Literal, Predicate},
};
use crate::{
    error::{ErrorOrigin, InternalError},
    model::{DataColumn, TableMetadata},
    value::{self, NativeValue},
};

const LIKE_ESCAPE: char = '!';

///
/// PredicateRenderer
///
/// Walks a filter tree against one table. Every column reference is
/// checked against the table metadata and every literal becomes a bound
/// parameter marshalled with the referenced column's type.
///

pub(crate) struct PredicateRenderer<'a> {
    dialect: Dialect,
    table: &'a TableMetadata,
}

impl<'a> PredicateRenderer<'a> {
    pub(crate) const fn new(dialect: Dialect, table: &'a TableMetadata) -> Self {
        Self { dialect, table }
    }

    pub(crate) fn render(
        &self,
        predicate: &Predicate,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        if self.dialect.is_cql() {
            self.render_cql(predicate, params)
        } else {
            self.render_sql(predicate, params)
        }
    }

    /// `col [dir], ...` for an `$orderby` list.
    pub(crate) fn render_order(&self, items: &[OrderItem]) -> Result<String, InternalError> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let column = self.column(&item.column)?;
            if !column.data_type.supports_ordering() {
                return Err(InternalError::query_generation(format!(
                    "cannot order by '{}': {} columns are not orderable",
                    column.name, column.data_type
                )));
            }
            let name = self.dialect.quote(&column.name);
            parts.push(match item.direction {
                Some(direction) => format!("{name} {direction}"),
                None => name.into_owned(),
            });
        }

        Ok(parts.join(", "))
    }

    pub(crate) fn column(&self, field: &str) -> Result<&'a DataColumn, InternalError> {
        self.table.column(field).ok_or_else(|| {
            InternalError::query_generation(format!(
                "unknown column '{field}' on table '{}'",
                self.table.name
            ))
        })
    }

    // ------------------------------------------------------------------
    // SQL
    // ------------------------------------------------------------------

    fn render_sql(
        &self,
        predicate: &Predicate,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        match predicate {
            Predicate::And(children) => self.render_sql_group(children, " AND ", "1 = 1", params),
            Predicate::Or(children) => self.render_sql_group(children, " OR ", "1 = 0", params),
            Predicate::Not(inner) => Ok(format!("NOT ({})", self.render_sql(inner, params)?)),
            Predicate::IsNull { field } => Ok(format!("{} IS NULL", self.column(field)?.name)),
            Predicate::Compare(cmp) => self.render_sql_compare(cmp, params),
        }
    }

    fn render_sql_group(
        &self,
        children: &[Predicate],
        joiner: &str,
        empty: &str,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        match children {
            [] => Ok(empty.to_string()),
            [only] => self.render_sql(only, params),
            _ => {
                let parts = children
                    .iter()
                    .map(|child| self.render_sql(child, params))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(format!("({})", parts.join(joiner)))
            }
        }
    }

    fn render_sql_compare(
        &self,
        cmp: &ComparePredicate,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        let column = self.column(&cmp.field)?;
        let name = &column.name;

        match (cmp.op, &cmp.value) {
            (CompareOp::Eq, Literal::Null) => Ok(format!("{name} IS NULL")),
            (CompareOp::Ne, Literal::Null) => Ok(format!("{name} IS NOT NULL")),
            (CompareOp::In | CompareOp::NotIn, literal) => {
                let keyword = if cmp.op == CompareOp::In { "IN" } else { "NOT IN" };
                let placeholders = bind_list(column, literal, cmp.op, params)?;

                Ok(format!("{name} {keyword} ({placeholders})"))
            }
            (op, Literal::Value(value)) if op.is_text_match() => {
                if !column.data_type.is_textual() {
                    return Err(InternalError::query_generation(format!(
                        "'{}' requires a textual column, '{name}' is {}",
                        op.name(),
                        column.data_type
                    )));
                }
                params.push(NativeValue::Text(like_pattern(op, value)));

                Ok(format!("{name} LIKE ? ESCAPE '{LIKE_ESCAPE}'"))
            }
            (op, Literal::Value(value)) => {
                let symbol = op.symbol().ok_or_else(|| bad_literal(op, name))?;
                params.push(value::to_native(column.data_type, Some(value))?);

                Ok(format!("{name} {symbol} ?"))
            }
            (op, _) => Err(bad_literal(op, name)),
        }
    }

    // ------------------------------------------------------------------
    // CQL
    // ------------------------------------------------------------------

    // CQL has no disjunction, negation or grouping: a filter is a flat
    // conjunction of relations.
    fn render_cql(
        &self,
        predicate: &Predicate,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        match predicate {
            Predicate::And(children) => {
                if children.is_empty() {
                    return Err(InternalError::query_generation("empty conjunction in filter"));
                }
                let parts = children
                    .iter()
                    .map(|child| self.render_cql(child, params))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(parts.join(" AND "))
            }
            Predicate::Or(_) => Err(self.unsupported("or")),
            Predicate::Not(_) => Err(self.unsupported("not")),
            Predicate::IsNull { .. } => Err(self.unsupported("is null")),
            Predicate::Compare(cmp) => self.render_cql_compare(cmp, params),
        }
    }

    fn render_cql_compare(
        &self,
        cmp: &ComparePredicate,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        let column = self.column(&cmp.field)?;
        let name = self.dialect.quote(&column.name);

        match (cmp.op, &cmp.value) {
            (CompareOp::In, literal) => {
                let placeholders = bind_list(column, literal, cmp.op, params)?;

                Ok(format!("{name} IN ({placeholders})"))
            }
            (
                op @ (CompareOp::Eq | CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte),
                Literal::Value(value),
            ) => {
                let symbol = op.symbol().ok_or_else(|| bad_literal(op, &column.name))?;
                params.push(value::to_native(column.data_type, Some(value))?);

                Ok(format!("{name} {symbol} ?"))
            }
            (CompareOp::Eq, Literal::Null) => Err(self.unsupported("eq null")),
            (
                op @ (CompareOp::Eq | CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte),
                _,
            ) => {
                Err(bad_literal(op, &column.name))
            }
            (op, _) => Err(self.unsupported(op.name())),
        }
    }

    fn unsupported(&self, construct: &str) -> InternalError {
        InternalError::unsupported(
            ErrorOrigin::Query,
            format!(
                "filter operator '{construct}' is not supported by the {} dialect",
                self.dialect
            ),
        )
    }
}

fn bind_list(
    column: &DataColumn,
    literal: &Literal,
    op: CompareOp,
    params: &mut Vec<NativeValue>,
) -> Result<String, InternalError> {
    let values: Vec<&str> = match literal {
        Literal::List(values) => values.iter().map(String::as_str).collect(),
        Literal::Value(value) => vec![value.as_str()],
        Literal::Null => return Err(bad_literal(op, &column.name)),
    };
    if values.is_empty() {
        return Err(InternalError::query_generation(format!(
            "'{}' on column '{}' needs at least one value",
            op.name(),
            column.name
        )));
    }

    for value in &values {
        params.push(value::to_native(column.data_type, Some(value))?);
    }

    Ok(vec!["?"; values.len()].join(", "))
}

fn like_pattern(op: CompareOp, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }

    match op {
        CompareOp::StartsWith => format!("{escaped}%"),
        CompareOp::EndsWith => format!("%{escaped}"),
        _ => format!("%{escaped}%"),
    }
}

fn bad_literal(op: CompareOp, column: &str) -> InternalError {
    InternalError::query_generation(format!(
        "operator '{}' cannot be applied to column '{column}' with the given literal",
        op.name()
    ))
}
