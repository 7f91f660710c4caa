use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;

use crate::database::manager::DatabaseError;
use crate::database::store::{Embed, SelectQuery, TenantPath, TenantPredicate, UpdateQuery};
use crate::filter::{Filter, FilterOrder, SqlResult};
use crate::types::Table;

/// Alias of the queried table in every generated statement
const ALIAS: &str = "t";

/// SQL generation for `DataStore` queries against Postgres.
///
/// Rows are returned as a single `jsonb` column named `row` so the store can
/// stay schema-agnostic; embeds are merged into that object.
pub struct QueryBuilder;

impl QueryBuilder {
    pub fn select_sql(query: &SelectQuery) -> Result<SqlResult, DatabaseError> {
        let (where_sql, params) = Self::where_sql(query.tenant.as_ref(), &query.filter)?;

        let mut sql = format!(
            "SELECT {} AS row FROM {} {} WHERE {}",
            Self::row_expression(&query.embeds),
            quote(query.table.as_str()),
            ALIAS,
            where_sql
        );
        let order = FilterOrder::generate(query.filter.order_data(), ALIAS);
        if !order.is_empty() {
            sql.push(' ');
            sql.push_str(&order);
        }
        let limit = query.filter.to_limit_sql();
        if !limit.is_empty() {
            sql.push(' ');
            sql.push_str(&limit);
        }

        Ok(SqlResult { query: sql, params })
    }

    pub fn count_sql(query: &SelectQuery) -> Result<SqlResult, DatabaseError> {
        let (where_sql, params) = Self::where_sql(query.tenant.as_ref(), &query.filter)?;
        Ok(SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM {} {} WHERE {}",
                quote(query.table.as_str()),
                ALIAS,
                where_sql
            ),
            params,
        })
    }

    /// Insert only the provided columns; omitted ones take their defaults.
    /// Values are coerced to column types through `jsonb_populate_record`.
    pub fn insert_sql(table: Table, row: &Map<String, Value>) -> Result<SqlResult, DatabaseError> {
        if row.is_empty() {
            return Err(DatabaseError::QueryError("Insert requires at least one column".to_string()));
        }
        let columns = Self::columns(row)?;
        let table_name = quote(table.as_str());
        Ok(SqlResult {
            query: format!(
                "INSERT INTO {table} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1) \
                 RETURNING to_jsonb({table}.*) AS row",
                table = table_name,
                cols = columns.join(", ")
            ),
            params: vec![Value::Object(row.clone())],
        })
    }

    pub fn update_sql(query: &UpdateQuery) -> Result<SqlResult, DatabaseError> {
        if query.patch.is_empty() {
            return Err(DatabaseError::QueryError("Update requires at least one column".to_string()));
        }
        let assignments: Vec<String> = Self::columns(&query.patch)?
            .into_iter()
            .map(|c| format!("{c} = p.{c}"))
            .collect();

        let mut params = vec![Value::Object(query.patch.clone()), Value::String(query.id.clone())];
        let mut predicate = format!("{}.\"id\"::text = $2", ALIAS);
        if let Some(tenant) = &query.tenant {
            let (tenant_sql, value) = Self::tenant_sql(tenant, params.len() + 1);
            predicate.push_str(" AND ");
            predicate.push_str(&tenant_sql);
            params.push(value);
        }

        let table_name = quote(query.table.as_str());
        Ok(SqlResult {
            query: format!(
                "UPDATE {table} {alias} SET {sets} FROM jsonb_populate_record(NULL::{table}, $1) p \
                 WHERE {predicate} RETURNING to_jsonb({alias}) AS row",
                table = table_name,
                alias = ALIAS,
                sets = assignments.join(", "),
                predicate = predicate
            ),
            params,
        })
    }

    /// Tenant predicate first, then the filter's WHERE clause
    fn where_sql(tenant: Option<&TenantPredicate>, filter: &Filter) -> Result<(String, Vec<Value>), DatabaseError> {
        let mut params = Vec::new();
        let mut parts = Vec::new();
        if let Some(tenant) = tenant {
            let (sql, value) = Self::tenant_sql(tenant, 1);
            parts.push(sql);
            params.push(value);
        }
        let filter_sql = filter.to_where_sql(params.len())?;
        if filter_sql.query != "1=1" || parts.is_empty() {
            parts.push(format!("({})", filter_sql.query));
        }
        params.extend(filter_sql.params);
        Ok((parts.join(" AND "), params))
    }

    fn tenant_sql(tenant: &TenantPredicate, index: usize) -> (String, Value) {
        let sql = match tenant.path {
            TenantPath::Direct => format!("{}.\"restaurant_id\"::text = ${}", ALIAS, index),
            TenantPath::ViaCategory => format!(
                "{}.\"category_id\" IN (SELECT c.\"id\" FROM \"menu_categories\" c WHERE c.\"restaurant_id\"::text = ${})",
                ALIAS, index
            ),
        };
        (sql, Value::String(tenant.restaurant_id.as_str().to_string()))
    }

    fn row_expression(embeds: &[Embed]) -> String {
        if embeds.is_empty() {
            return format!("to_jsonb({})", ALIAS);
        }
        let fields: Vec<String> = embeds
            .iter()
            .map(|embed| {
                let projection: Vec<String> = embed
                    .columns
                    .iter()
                    .map(|c| format!("'{}', e.{}", c, quote(c)))
                    .collect();
                format!(
                    "'{}', (SELECT COALESCE(jsonb_agg(jsonb_build_object({})), '[]'::jsonb) FROM {} e WHERE e.{} = {}.{})",
                    embed.name,
                    projection.join(", "),
                    quote(embed.table.as_str()),
                    quote(embed.foreign_column),
                    ALIAS,
                    quote(embed.local_column)
                )
            })
            .collect();
        format!("(to_jsonb({}) || jsonb_build_object({}))", ALIAS, fields.join(", "))
    }

    fn columns(row: &Map<String, Value>) -> Result<Vec<String>, DatabaseError> {
        row.keys()
            .map(|k| {
                Filter::validate_column(k)?;
                Ok(quote(k))
            })
            .collect()
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Arrays are expanded by FilterWhere; objects are row payloads (jsonb)
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}
