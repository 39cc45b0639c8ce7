use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `tbm9` production table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub sno: i64,
    pub operator_id: Option<String>,
    pub p_shift: Option<String>,
    pub recipe_name: Option<String>,
    pub performance: Option<f64>,
    pub production_date: Option<NaiveDate>,
    pub drum_changeover: Option<i32>,
}

impl ProductionRecord {
    /// Orders records so that the "latest" one compares greatest: by
    /// production date with missing dates lowest, then by `sno`.
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        let by_date = match (self.production_date, other.production_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        by_date.then(self.sno.cmp(&other.sno))
    }
}
