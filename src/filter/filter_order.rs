use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::filter_where::compare_values;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = Self::parse_order_string(order);
        for info in &infos {
            Filter::validate_column(&info.column)?;
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        s.split(',')
            .filter_map(|part| {
                let mut it = part.split_whitespace();
                let column = it.next()?;
                Some(FilterOrderInfo {
                    column: column.to_string(),
                    sort: Self::direction(it.next().unwrap_or("asc")),
                })
            })
            .collect()
    }

    fn direction(value: &str) -> SortDirection {
        if value.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    /// `ORDER BY` clause qualified with `alias`; empty when there is no ordering
    pub fn generate(infos: &[FilterOrderInfo], alias: &str) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{}.\"{}\" {} NULLS LAST", alias, i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Stable in-memory sort with the same semantics as [`FilterOrder::generate`]
    pub fn sort(rows: &mut [Value], infos: &[FilterOrderInfo]) {
        if infos.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for info in infos {
                let left = a.get(&info.column).unwrap_or(&Value::Null);
                let right = b.get(&info.column).unwrap_or(&Value::Null);
                let ordering = match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => {
                        let natural = compare_values(left, right).unwrap_or(Ordering::Equal);
                        match info.sort {
                            SortDirection::Asc => natural,
                            SortDirection::Desc => natural.reverse(),
                        }
                    }
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}
