use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, SqlResult};

/// Validated filter: a WHERE clause, an ordering and an optional limit.
///
/// Table and tenant handling live in the query builder; a `Filter` only
/// knows about columns of a single row.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        // Compile once up front so column and operator errors surface here
        FilterWhere::generate(&conditions, 0)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    /// `"column [asc|desc], ..."`
    pub fn order(&mut self, order: &str) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(order)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn where_data(&self) -> Option<&Value> {
        self.where_data.as_ref()
    }

    pub fn order_data(&self) -> &[FilterOrderInfo] {
        &self.order_data
    }

    /// WHERE body (without the keyword) with placeholders after `start`
    pub fn to_where_sql(&self, start: usize) -> Result<SqlResult, FilterError> {
        let (query, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, start)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_limit_sql(&self) -> String {
        match self.limit {
            Some(l) => format!("LIMIT {}", l),
            None => String::new(),
        }
    }

    /// Evaluate the WHERE clause against a JSON row
    pub fn matches(&self, row: &Value) -> Result<bool, FilterError> {
        match self.where_data {
            Some(ref where_data) => FilterWhere::matches(where_data, row),
            None => Ok(true),
        }
    }

    /// Apply where, order and limit to an in-memory row set
    pub fn apply(&self, rows: Vec<Value>) -> Result<Vec<Value>, FilterError> {
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if self.matches(&row)? {
                kept.push(row);
            }
        }
        FilterOrder::sort(&mut kept, &self.order_data);
        if let Some(limit) = self.limit {
            kept.truncate(limit.max(0) as usize);
        }
        Ok(kept)
    }

    pub fn validate_column(column: &str) -> Result<(), FilterError> {
        let mut chars = column.chars();
        let valid = match chars.next() {
            Some(first) => (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
            None => false,
        };
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidColumn(format!("Invalid column name format: {:?}", column)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_where_and_limit() {
        let mut filter = Filter::new();
        filter
            .where_clause(json!({ "payment_status": "VERIFIED" }))
            .unwrap()
            .order("created_at desc")
            .unwrap()
            .limit(5)
            .unwrap();

        let sql = filter.to_where_sql(1).unwrap();
        assert_eq!(sql.query, "\"payment_status\"::text = $2");
        assert_eq!(filter.to_limit_sql(), "LIMIT 5");
    }

    #[test]
    fn rejects_negative_limit() {
        assert!(matches!(Filter::new().limit(-1), Err(FilterError::InvalidLimit(_))));
    }

    #[test]
    fn apply_filters_sorts_and_limits() {
        let rows = vec![
            json!({ "id": "a", "status": "PENDING", "created_at": "2024-01-01T00:00:00Z" }),
            json!({ "id": "b", "status": "COMPLETED", "created_at": "2024-01-02T00:00:00Z" }),
            json!({ "id": "c", "status": "PENDING", "created_at": "2024-01-03T00:00:00Z" }),
        ];
        let mut filter = Filter::new();
        filter
            .where_clause(json!({ "status": "PENDING" }))
            .unwrap()
            .order("created_at desc")
            .unwrap()
            .limit(1)
            .unwrap();

        let out = filter.apply(rows).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], "c");
    }

    #[test]
    fn column_validation() {
        assert!(Filter::validate_column("restaurant_id").is_ok());
        assert!(Filter::validate_column("").is_err());
        assert!(Filter::validate_column("1abc").is_err());
        assert!(Filter::validate_column("name\"--").is_err());
    }
}
