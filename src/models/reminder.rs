use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::numeric::lenient_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReminderCategory {
    #[default]
    Vaccine,
    Consultation,
    Medication,
}

impl ReminderCategory {
    pub fn as_stored(self) -> &'static str {
        match self {
            ReminderCategory::Vaccine => "vaccine",
            ReminderCategory::Consultation => "consultation",
            ReminderCategory::Medication => "medication",
        }
    }

    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for ReminderCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vaccine" | "vacina" => Ok(ReminderCategory::Vaccine),
            "consultation" | "consulta" => Ok(ReminderCategory::Consultation),
            "medication" | "medicamento" => Ok(ReminderCategory::Medication),
            other => Err(format!("unknown reminder type: {}", other)),
        }
    }
}

impl fmt::Display for ReminderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

/// A `reminders` row as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReminderRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type", default)]
    pub category: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: String,
    pub owner_id: Option<String>,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub category: ReminderCategory,
    pub completed: bool,
}

impl Reminder {
    pub fn from_row(row: ReminderRow) -> Self {
        Self {
            id: row.id.unwrap_or_default(),
            owner_id: row.owner_id,
            title: row.title.unwrap_or_default(),
            date: row.date,
            category: ReminderCategory::from_stored(row.category.as_deref()),
            completed: row.completed.unwrap_or(false),
        }
    }

    pub fn to_row(&self) -> ReminderRow {
        ReminderRow {
            id: Some(self.id.clone()).filter(|id| !id.is_empty()),
            owner_id: self.owner_id.clone(),
            title: Some(self.title.trim().to_string()),
            date: self.date,
            category: Some(self.category.as_stored().to_string()),
            completed: Some(self.completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_type_column() {
        let reminder = Reminder::from_row(
            serde_json::from_value(json!({
                "id": "r1",
                "owner_id": "u1",
                "title": "V4",
                "date": "2024-09-10",
                "type": "consultation",
                "completed": null
            }))
            .unwrap(),
        );
        assert_eq!(reminder.category, ReminderCategory::Consultation);
        assert!(!reminder.completed);

        let row = serde_json::to_value(reminder.to_row()).unwrap();
        assert_eq!(row["type"], "consultation");
        assert_eq!(row["completed"], false);
        assert_eq!(row["date"], "2024-09-10");
    }

    #[test]
    fn unknown_type_defaults_to_vaccine() {
        let reminder = Reminder::from_row(
            serde_json::from_value(json!({ "id": "r2", "type": "grooming" })).unwrap(),
        );
        assert_eq!(reminder.category, ReminderCategory::Vaccine);
        assert_eq!(reminder.title, "");
        assert_eq!(reminder.date, None);
    }
}
