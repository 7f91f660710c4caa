use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;

/// WHERE clause compiler for the JSON filter dialect.
///
/// `{ "field": value }` is equality and `$or` takes an array of nested
/// clauses. The same clause can be compiled to parameterized SQL or evaluated
/// against a JSON row.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Compile to SQL; placeholders start at `$starting_param_index + 1`
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("1=1".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut parts = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.build_or(key, value)?);
            } else {
                parts.push(self.build_equality(key, value)?);
            }
        }

        Ok(if parts.is_empty() { "1=1".to_string() } else { parts.join(" AND ") })
    }

    fn build_or(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        let branches = or_branches(op, value)?;
        if branches.is_empty() {
            return Ok("1=0".to_string());
        }
        let mut sql_parts = Vec::with_capacity(branches.len());
        for branch in branches {
            sql_parts.push(format!("({})", self.build(branch)?));
        }
        Ok(format!("({})", sql_parts.join(" OR ")))
    }

    fn build_equality(&mut self, field: &str, value: &Value) -> Result<String, FilterError> {
        Filter::validate_column(field)?;
        match value {
            Value::Null => Ok(format!("{} IS NULL", quote(field))),
            Value::Array(_) | Value::Object(_) => Err(FilterError::InvalidWhereClause(format!(
                "'{}' requires a scalar value",
                field
            ))),
            scalar => {
                let placeholder = self.param(scalar.clone());
                Ok(format!("{} = {}", column_for(field, scalar), placeholder))
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    /// Evaluate a WHERE clause against a JSON row
    pub fn matches(where_data: &Value, row: &Value) -> Result<bool, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(true),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        for (key, value) in obj {
            let matched = if key.starts_with('$') {
                let mut any = false;
                for branch in or_branches(key, value)? {
                    any |= Self::matches(branch, row)?;
                }
                any
            } else {
                let actual = row.get(key).unwrap_or(&Value::Null);
                match value {
                    Value::Null => actual.is_null(),
                    // NULL never equals a value, as in SQL
                    expected => !actual.is_null() && compare_values(actual, expected) == Some(Ordering::Equal),
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn or_branches<'a>(op: &str, value: &'a Value) -> Result<&'a Vec<Value>, FilterError> {
    if op != "$or" {
        return Err(FilterError::UnsupportedOperator(op.to_string()));
    }
    value
        .as_array()
        .ok_or_else(|| FilterError::InvalidWhereClause("$or requires an array".to_string()))
}

fn quote(column: &str) -> String {
    format!("\"{}\"", column)
}

/// Text parameters compare against the column's text form, so uuid and enum
/// columns bind without per-column type hints.
fn column_for(field: &str, value: &Value) -> String {
    if value.is_string() {
        format!("{}::text", quote(field))
    } else {
        quote(field)
    }
}

/// Compare two JSON scalars the way the database would: numbers numerically
/// (numeric strings included, decimals serialize as strings), everything else
/// by its natural order. `None` when the values are not comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
