use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::numeric::{lenient_date, lenient_f64, lenient_timestamp};

/// Unit recorded next to a weight. Stored only; weights are never converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    pub fn as_stored(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }

    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for WeightUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lbs),
            other => Err(format!("unknown weight unit: {}", other)),
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

/// A `weight_records` row as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeightRecordRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub cat_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    /// Set by the backend on insert when the table carries the column
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    pub id: String,
    pub pet_id: String,
    pub weight: f64,
    pub unit: WeightUnit,
    pub date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
}

impl WeightRecord {
    /// Map a stored row. Rows without a usable weight or date yield `None`.
    pub fn from_row(row: WeightRecordRow) -> Option<Self> {
        Some(Self {
            id: row.id.unwrap_or_default(),
            pet_id: row.cat_id.unwrap_or_default(),
            weight: row.weight?,
            unit: WeightUnit::from_stored(row.unit.as_deref()),
            date: row.date?,
            created_at: row.created_at,
        })
    }

    pub fn to_row(&self) -> WeightRecordRow {
        WeightRecordRow {
            id: Some(self.id.clone()).filter(|id| !id.is_empty()),
            cat_id: Some(self.pet_id.clone()),
            weight: Some(self.weight),
            unit: Some(self.unit.as_stored().to_string()),
            date: Some(self.date),
            created_at: None,
        }
    }
}

/// Oldest first by date, then by creation time when the backend reports it.
///
/// The sort is stable, so records that still tie keep the order they were
/// returned in, which is insertion order for rows sharing a date.
pub fn sort_chronologically(records: &mut [WeightRecord]) {
    records.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

/// Map rows, dropping (and logging) the ones that cannot be used
pub fn records_from_rows(rows: Vec<WeightRecordRow>) -> Vec<WeightRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            let record = WeightRecord::from_row(row);
            if record.is_none() {
                tracing::warn!(id = ?id, "skipping weight record without weight or date");
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_without_weight_or_date_are_dropped() {
        let rows: Vec<WeightRecordRow> = serde_json::from_value(json!([
            { "id": "w1", "cat_id": "c1", "weight": 4.8, "date": "2024-07-01", "unit": "kg" },
            { "id": "w2", "cat_id": "c1", "weight": null, "date": "2024-07-02" },
            { "id": "w3", "cat_id": "c1", "weight": "4,9", "date": null },
            { "id": "w4", "cat_id": "c1", "weight": "4,9", "date": "2024-08-01", "unit": "lbs" }
        ]))
        .unwrap();

        let records = records_from_rows(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "w1");
        assert_eq!(records[1].weight, 4.9);
        assert_eq!(records[1].unit, WeightUnit::Lbs);
    }

    #[test]
    fn to_row_writes_date_and_unit() {
        let record = WeightRecord {
            id: String::new(),
            pet_id: "c1".to_string(),
            weight: 4.9,
            unit: WeightUnit::Kg,
            date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            created_at: None,
        };
        assert_eq!(
            serde_json::to_value(record.to_row()).unwrap(),
            json!({ "cat_id": "c1", "weight": 4.9, "unit": "kg", "date": "2024-08-01" })
        );
    }

    #[test]
    fn same_day_records_order_by_creation_then_arrival() {
        let rows: Vec<WeightRecordRow> = serde_json::from_value(json!([
            { "id": "w3", "weight": 5.0, "date": "2024-08-02" },
            { "id": "w1", "weight": 5.2, "date": "2024-08-01" },
            { "id": "w2", "weight": 4.9, "date": "2024-08-01" }
        ]))
        .unwrap();
        let mut records = records_from_rows(rows);
        sort_chronologically(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["w1", "w2", "w3"]);

        let rows: Vec<WeightRecordRow> = serde_json::from_value(json!([
            { "id": "late", "weight": 4.9, "date": "2024-08-01", "created_at": "2024-08-01T20:00:00+00:00" },
            { "id": "early", "weight": 5.2, "date": "2024-08-01", "created_at": "2024-08-01 08:00:00" }
        ]))
        .unwrap();
        let mut records = records_from_rows(rows);
        sort_chronologically(&mut records);
        assert_eq!(records[0].id, "early");
        assert_eq!(records[1].id, "late");
    }
}
