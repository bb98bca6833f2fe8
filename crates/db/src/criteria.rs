//! Dynamic predicate building for criteria-based queries.
//!
//! A [`Criteria`] accumulates SQL conditions with 1-based `$n` placeholders
//! and the typed values to bind for them. Each entity's filter struct
//! implements [`CriteriaBuilder`] to translate its flat fields into
//! predicates; the generic repository turns the result into WHERE clauses.

use bms_core::types::{DbId, Timestamp};
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

/// Typed bind value for dynamically-built queries.
#[derive(Debug, Clone)]
pub enum BindValue {
    BigInt(DbId),
    Int(i32),
    Text(String),
    Bool(bool),
    Timestamp(Timestamp),
}

/// Per-entity mapping from a flat filter object to engine predicates.
pub trait CriteriaBuilder {
    fn build(&self) -> Criteria;
}

/// Accumulated conditions (joined with AND) plus their bind values.
#[derive(Debug, Default)]
pub struct Criteria {
    conditions: Vec<String>,
    values: Vec<BindValue>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder index the next pushed value will receive.
    pub fn next_placeholder(&self) -> u32 {
        self.values.len() as u32 + 1
    }

    pub fn eq(&mut self, column: &str, value: BindValue) -> &mut Self {
        let idx = self.next_placeholder();
        self.conditions.push(format!("{column} = ${idx}"));
        self.values.push(value);
        self
    }

    pub fn ne(&mut self, column: &str, value: BindValue) -> &mut Self {
        let idx = self.next_placeholder();
        self.conditions.push(format!("{column} <> ${idx}"));
        self.values.push(value);
        self
    }

    /// Case-insensitive "contains" fanned out as an OR across `columns`.
    /// One bind value is shared by every branch.
    pub fn contains_any(&mut self, columns: &[&str], needle: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let idx = self.next_placeholder();
        let branches: Vec<String> = columns
            .iter()
            .map(|col| format!("{col} ILIKE ${idx}"))
            .collect();
        self.conditions.push(format!("({})", branches.join(" OR ")));
        self.values.push(BindValue::Text(format!("%{needle}%")));
        self
    }

    /// Closed timestamp range; either bound may be absent.
    pub fn between(
        &mut self,
        column: &str,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> &mut Self {
        if let Some(from) = from {
            let idx = self.next_placeholder();
            self.conditions.push(format!("{column} >= ${idx}"));
            self.values.push(BindValue::Timestamp(from));
        }
        if let Some(to) = to {
            let idx = self.next_placeholder();
            self.conditions.push(format!("{column} <= ${idx}"));
            self.values.push(BindValue::Timestamp(to));
        }
        self
    }

    pub fn is_null(&mut self, column: &str) -> &mut Self {
        self.conditions.push(format!("{column} IS NULL"));
        self
    }

    pub fn not_null(&mut self, column: &str) -> &mut Self {
        self.conditions.push(format!("{column} IS NOT NULL"));
        self
    }

    /// Literal condition with no bind values (e.g. soft-delete exclusion).
    pub fn raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Empty string when no conditions are active, otherwise `WHERE ...`.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[BindValue] {
        &self.values
    }
}

/// Bind accumulated values to a `QueryAs` in push order.
pub(crate) fn bind_values<'q, O>(
    mut q: QueryAs<'q, Postgres, O, PgArguments>,
    values: &'q [BindValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in values {
        match value {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Int(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Bool(v) => q = q.bind(*v),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Bind accumulated values to a `QueryScalar` (count queries).
pub(crate) fn bind_values_scalar<'q>(
    mut q: QueryScalar<'q, Postgres, i64, PgArguments>,
    values: &'q [BindValue],
) -> QueryScalar<'q, Postgres, i64, PgArguments> {
    for value in values {
        match value {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Int(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Bool(v) => q = q.bind(*v),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_criteria_has_no_where_clause() {
        let criteria = Criteria::new();
        assert!(criteria.is_empty());
        assert_eq!(criteria.where_clause(), "");
        assert_eq!(criteria.next_placeholder(), 1);
    }

    #[test]
    fn placeholders_are_numbered_in_push_order() {
        let mut criteria = Criteria::new();
        criteria
            .eq("status", BindValue::Text("NEW".to_string()))
            .eq("processor_id", BindValue::BigInt(7));
        assert_eq!(
            criteria.where_clause(),
            "WHERE status = $1 AND processor_id = $2"
        );
        assert_eq!(criteria.next_placeholder(), 3);
    }

    #[test]
    fn contains_any_shares_one_placeholder() {
        let mut criteria = Criteria::new();
        criteria.contains_any(&["name", "email"], "doe");
        assert_eq!(
            criteria.where_clause(),
            "WHERE (name ILIKE $1 OR email ILIKE $1)"
        );
        assert_eq!(criteria.values().len(), 1);
        match &criteria.values()[0] {
            BindValue::Text(pattern) => assert_eq!(pattern, "%doe%"),
            other => panic!("expected text bind, got {other:?}"),
        }
    }

    #[test]
    fn null_checks_bind_nothing() {
        let mut criteria = Criteria::new();
        criteria.is_null("processor_id").not_null("customer_id");
        assert_eq!(
            criteria.where_clause(),
            "WHERE processor_id IS NULL AND customer_id IS NOT NULL"
        );
        assert!(criteria.values().is_empty());
        assert_eq!(criteria.next_placeholder(), 1);
    }

    #[test]
    fn between_skips_absent_bounds() {
        use chrono::{TimeZone, Utc};
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let mut criteria = Criteria::new();
        criteria.between("created_at", Some(from), None);
        assert_eq!(criteria.where_clause(), "WHERE created_at >= $1");
        assert_eq!(criteria.values().len(), 1);
    }

    #[test]
    fn raw_condition_mixes_with_bound_ones() {
        let mut criteria = Criteria::new();
        criteria
            .raw("status <> 'DELETED'")
            .eq("newsletter", BindValue::Bool(true));
        assert_eq!(
            criteria.where_clause(),
            "WHERE status <> 'DELETED' AND newsletter = $1"
        );
    }
}
