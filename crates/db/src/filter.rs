//! Dynamic WHERE-clause builder for list and count queries.
//!
//! Conditions are accumulated with positional placeholders so the same
//! filter can drive both the page query and its `COUNT(*)` companion.

use projectflow_core::types::Timestamp;

/// Typed bind value for dynamically-built queries.
#[derive(Debug, Clone)]
pub(crate) enum BindValue {
    BigInt(i64),
    Bool(bool),
    Text(String),
    TextArray(Vec<String>),
    Timestamp(Timestamp),
}

/// Accumulates `AND`-joined conditions and their bind values.
#[derive(Debug, Default)]
pub(crate) struct Filter {
    conditions: Vec<String>,
    bind_values: Vec<BindValue>,
}

impl Filter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a condition without bind values (e.g. `deleted_at IS NULL`).
    pub(crate) fn raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// Add `<expr> <op> $n` for one bound value.
    pub(crate) fn cmp(&mut self, expr: &str, op: &str, value: BindValue) -> &mut Self {
        let idx = self.next_index();
        self.conditions.push(format!("{expr} {op} ${idx}"));
        self.bind_values.push(value);
        self
    }

    pub(crate) fn eq(&mut self, column: &str, value: BindValue) -> &mut Self {
        self.cmp(column, "=", value)
    }

    /// Add `<column> = ANY($n)` for membership in a text array.
    pub(crate) fn any_of(&mut self, column: &str, values: Vec<String>) -> &mut Self {
        let idx = self.next_index();
        self.conditions.push(format!("{column} = ANY(${idx})"));
        self.bind_values.push(BindValue::TextArray(values));
        self
    }

    /// Add `(<a> ILIKE $n OR <b> ILIKE $n ...)` for a `%term%` search.
    pub(crate) fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        let idx = self.next_index();
        let ors: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} ILIKE ${idx}"))
            .collect();
        self.conditions.push(format!("({})", ors.join(" OR ")));
        self.bind_values.push(BindValue::Text(format!("%{term}%")));
        self
    }

    /// Index of the next positional placeholder.
    pub(crate) fn next_index(&self) -> u32 {
        self.bind_values.len() as u32 + 1
    }

    /// Empty when no conditions are active, otherwise starts with `WHERE `.
    pub(crate) fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub(crate) fn values(&self) -> &[BindValue] {
        &self.bind_values
    }
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
pub(crate) fn bind_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        q = match val {
            BindValue::BigInt(v) => q.bind(*v),
            BindValue::Bool(v) => q.bind(*v),
            BindValue::Text(v) => q.bind(v.as_str()),
            BindValue::TextArray(v) => q.bind(v.as_slice()),
            BindValue::Timestamp(v) => q.bind(*v),
        };
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
pub(crate) fn bind_values_scalar<'q, O>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        q = match val {
            BindValue::BigInt(v) => q.bind(*v),
            BindValue::Bool(v) => q.bind(*v),
            BindValue::Text(v) => q.bind(v.as_str()),
            BindValue::TextArray(v) => q.bind(v.as_slice()),
            BindValue::Timestamp(v) => q.bind(*v),
        };
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let filter = Filter::new();
        assert_eq!(filter.where_clause(), "");
        assert_eq!(filter.next_index(), 1);
    }

    #[test]
    fn placeholders_are_numbered_in_order() {
        let mut filter = Filter::new();
        filter
            .raw("deleted_at IS NULL")
            .eq("project_id", BindValue::BigInt(3))
            .search(&["name", "project_no"], "pack")
            .cmp("created_at", ">=", BindValue::Timestamp(chrono::Utc::now()));

        assert_eq!(
            filter.where_clause(),
            "WHERE deleted_at IS NULL AND project_id = $1 \
             AND (name ILIKE $2 OR project_no ILIKE $2) AND created_at >= $3"
        );
        assert_eq!(filter.next_index(), 4);
        assert_eq!(filter.values().len(), 3);
    }

    #[test]
    fn any_of_wraps_placeholder() {
        let mut filter = Filter::new();
        filter
            .eq("assignee_id", BindValue::BigInt(7))
            .any_of("status", vec!["completed".into(), "rejected".into()]);
        assert_eq!(
            filter.where_clause(),
            "WHERE assignee_id = $1 AND status = ANY($2)"
        );
    }
}
