//! Tenant-scoped SQL builders.
//!
//! Every list and update statement in the API goes through one of these
//! builders, so the `tenant_id` predicate is structurally impossible to
//! forget: `ScopedQuery::new` and `ScopedUpdate::to_sql` emit it themselves.
//! Column and table names are `&'static str` supplied by handler code; only
//! values travel through bind parameters.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A typed bind value. Postgres needs the real column type on the wire, so
/// filters carry these instead of stringly-typed values.
#[derive(Debug, Clone)]
pub enum Bind {
    Text(String),
    Uuid(Uuid),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Decimal(Decimal),
}

impl Bind {
    pub fn text(s: impl Into<String>) -> Self {
        Bind::Text(s.into())
    }
}

/// Apply one typed bind to any sqlx query shape.
macro_rules! apply_bind {
    ($q:expr, $bind:expr) => {
        match $bind {
            Bind::Text(s) => $q.bind(s.as_str()),
            Bind::Uuid(u) => $q.bind(*u),
            Bind::Int(i) => $q.bind(*i),
            Bind::Bool(b) => $q.bind(*b),
            Bind::Date(d) => $q.bind(*d),
            Bind::Timestamp(t) => $q.bind(*t),
            Bind::Decimal(d) => $q.bind(*d),
        }
    };
}

/// Escape `%`, `_` and `\` so user search terms match literally inside a
/// LIKE pattern.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SELECT builder that always carries `tenant_id = $1`.
pub struct ScopedQuery {
    table: &'static str,
    conditions: Vec<String>,
    binds: Vec<Bind>,
}

impl ScopedQuery {
    pub fn new(table: &'static str, tenant_id: Uuid) -> Self {
        Self {
            table,
            conditions: vec!["tenant_id = $1".to_string()],
            binds: vec![Bind::Uuid(tenant_id)],
        }
    }

    fn push_bind(&mut self, value: Bind) -> usize {
        self.binds.push(value);
        self.binds.len()
    }

    pub fn eq(&mut self, column: &'static str, value: Bind) -> &mut Self {
        let n = self.push_bind(value);
        self.conditions.push(format!("{} = ${}", column, n));
        self
    }

    pub fn gte(&mut self, column: &'static str, value: Bind) -> &mut Self {
        let n = self.push_bind(value);
        self.conditions.push(format!("{} >= ${}", column, n));
        self
    }

    pub fn lte(&mut self, column: &'static str, value: Bind) -> &mut Self {
        let n = self.push_bind(value);
        self.conditions.push(format!("{} <= ${}", column, n));
        self
    }

    /// Case-insensitive substring match across one or more columns, sharing a
    /// single bind parameter.
    pub fn search(&mut self, columns: &[&'static str], term: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let pattern = format!("%{}%", escape_like(term));
        let n = self.push_bind(Bind::Text(pattern));
        let ors: Vec<String> = columns
            .iter()
            .map(|c| format!("{} ILIKE ${}", c, n))
            .collect();
        self.conditions.push(format!("({})", ors.join(" OR ")));
        self
    }

    pub fn to_select(&self, order_by: &str, limit: i64, offset: i64) -> String {
        format!(
            "SELECT * FROM {} WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
            self.table,
            self.conditions.join(" AND "),
            order_by,
            limit,
            offset
        )
    }

    pub fn to_count(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            self.table,
            self.conditions.join(" AND ")
        )
    }

    pub fn binds(&self) -> &[Bind] {
        &self.binds
    }

    /// Run the count and page queries, returning `(rows, total)`.
    pub async fn fetch_page<T>(
        &self,
        pool: &PgPool,
        order_by: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<T>, i64), sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let count_sql = self.to_count();
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &self.binds {
            count_q = apply_bind!(count_q, bind);
        }
        let total = count_q.fetch_one(pool).await?;

        let select_sql = self.to_select(order_by, limit, offset);
        let mut rows_q = sqlx::query_as::<_, T>(&select_sql);
        for bind in &self.binds {
            rows_q = apply_bind!(rows_q, bind);
        }
        let rows = rows_q.fetch_all(pool).await?;

        Ok((rows, total))
    }
}

/// Partial UPDATE builder. The WHERE clause always pins `id` and `tenant_id`;
/// state transitions add guards so the source state is re-checked inside the
/// statement itself.
pub struct ScopedUpdate {
    table: &'static str,
    sets: Vec<&'static str>,
    set_binds: Vec<Bind>,
    guards: Vec<(&'static str, Bind)>,
}

impl ScopedUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
            set_binds: Vec::new(),
            guards: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: Bind) -> &mut Self {
        self.sets.push(column);
        self.set_binds.push(value);
        self
    }

    /// Set a column only when the payload supplied it.
    pub fn set_opt(&mut self, column: &'static str, value: Option<Bind>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    /// Additional equality condition, e.g. a required source state.
    pub fn guard(&mut self, column: &'static str, value: Bind) -> &mut Self {
        self.guards.push((column, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn to_sql(&self) -> String {
        let mut assignments: Vec<String> = self
            .sets
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ${}", col, i + 1))
            .collect();
        assignments.push("updated_at = now()".to_string());

        let id_n = self.set_binds.len() + 1;
        let tenant_n = self.set_binds.len() + 2;
        let mut conditions = vec![
            format!("id = ${}", id_n),
            format!("tenant_id = ${}", tenant_n),
        ];
        for (i, (col, _)) in self.guards.iter().enumerate() {
            conditions.push(format!("{} = ${}", col, tenant_n + 1 + i));
        }

        format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            self.table,
            assignments.join(", "),
            conditions.join(" AND ")
        )
    }

    /// Execute, returning the updated row or `None` if no row matched the
    /// id/tenant/guard conditions.
    pub async fn fetch_optional<'e, T, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: sqlx::PgExecutor<'e>,
    {
        let sql = self.to_sql();
        let mut q = sqlx::query_as::<_, T>(&sql);
        for bind in &self.set_binds {
            q = apply_bind!(q, bind);
        }
        q = q.bind(id).bind(tenant_id);
        for (_, bind) in &self.guards {
            q = apply_bind!(q, bind);
        }
        q.fetch_optional(executor).await
    }
}

/// True when a row with this id exists inside the tenant. Used to validate
/// client-supplied foreign keys before inserting; the FK constraint alone
/// would accept a row from another tenant.
pub async fn tenant_row_exists<'e, E>(
    executor: E,
    table: &'static str,
    id: Uuid,
    tenant_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND tenant_id = $2)",
        table
    );
    sqlx::query_scalar::<_, bool>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> Uuid {
        Uuid::nil()
    }

    #[test]
    fn test_tenant_predicate_is_always_first() {
        let q = ScopedQuery::new("students", tenant());
        assert_eq!(
            q.to_count(),
            "SELECT COUNT(*) FROM students WHERE tenant_id = $1"
        );
        assert_eq!(q.binds().len(), 1);
    }

    #[test]
    fn test_filters_accumulate_param_indexes() {
        let mut q = ScopedQuery::new("invoices", tenant());
        q.eq("status", Bind::text("UNPAID"))
            .gte("due_date", Bind::Date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()))
            .lte("due_date", Bind::Date(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()));

        assert_eq!(
            q.to_select("created_at DESC", 20, 40),
            "SELECT * FROM invoices WHERE tenant_id = $1 AND status = $2 \
             AND due_date >= $3 AND due_date <= $4 \
             ORDER BY created_at DESC LIMIT 20 OFFSET 40"
        );
        assert_eq!(q.binds().len(), 4);
    }

    #[test]
    fn test_search_shares_one_bind_across_columns() {
        let mut q = ScopedQuery::new("students", tenant());
        q.search(&["first_name", "last_name", "admission_no"], "rao");

        assert_eq!(
            q.to_count(),
            "SELECT COUNT(*) FROM students WHERE tenant_id = $1 AND \
             (first_name ILIKE $2 OR last_name ILIKE $2 OR admission_no ILIKE $2)"
        );
        assert_eq!(q.binds().len(), 2);
    }

    #[test]
    fn test_search_escapes_like_metacharacters() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");

        let mut q = ScopedQuery::new("books", tenant());
        q.search(&["title"], "50%");
        match &q.binds()[1] {
            Bind::Text(pattern) => assert_eq!(pattern, "%50\\%%"),
            other => panic!("expected text bind, got {:?}", other),
        }
    }

    #[test]
    fn test_update_pins_id_and_tenant_after_sets() {
        let mut u = ScopedUpdate::new("books");
        u.set("title", Bind::text("New title"))
            .set("author", Bind::text("Someone"));

        assert_eq!(
            u.to_sql(),
            "UPDATE books SET title = $1, author = $2, updated_at = now() \
             WHERE id = $3 AND tenant_id = $4 RETURNING *"
        );
    }

    #[test]
    fn test_update_guard_appends_condition() {
        let mut u = ScopedUpdate::new("leave_requests");
        u.set("status", Bind::text("APPROVED"))
            .guard("status", Bind::text("PENDING"));

        assert_eq!(
            u.to_sql(),
            "UPDATE leave_requests SET status = $1, updated_at = now() \
             WHERE id = $2 AND tenant_id = $3 AND status = $4 RETURNING *"
        );
    }

    #[test]
    fn test_update_set_opt_skips_absent_fields() {
        let mut u = ScopedUpdate::new("expenses");
        u.set_opt("title", Some(Bind::text("Chalk")))
            .set_opt("notes", None);

        assert!(!u.is_empty());
        assert_eq!(
            u.to_sql(),
            "UPDATE expenses SET title = $1, updated_at = now() \
             WHERE id = $2 AND tenant_id = $3 RETURNING *"
        );
    }

    #[test]
    fn test_empty_update_is_detectable() {
        let u = ScopedUpdate::new("expenses");
        assert!(u.is_empty());
    }
}
