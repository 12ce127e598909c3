use chrono::{Local, NaiveDate};
use cura4pif_postgrest::SortOrder;
use serde_json::json;

use crate::error::{Error, Result};
use crate::gateway::{tables, Gateway};
use crate::models::{
    parse_date, parse_decimal, records_from_rows, sort_chronologically, WeightRecord,
    WeightRecordRow, WeightUnit,
};

/// New weight measurement for one pet
pub struct WeightEntryController<'a> {
    gateway: &'a Gateway,
    pet_id: String,
    pub weight: String,
    /// `YYYY-MM-DD`, today by default
    pub date: String,
    pub unit: WeightUnit,
}

impl<'a> WeightEntryController<'a> {
    pub fn new(gateway: &'a Gateway, pet_id: &str) -> Self {
        Self {
            gateway,
            pet_id: pet_id.to_string(),
            weight: String::new(),
            date: Local::now().date_naive().to_string(),
            unit: WeightUnit::Kg,
        }
    }

    fn parsed(&self) -> Result<(f64, NaiveDate)> {
        let weight = parse_decimal(&self.weight)
            .filter(|w| *w > 0.0)
            .ok_or_else(|| Error::Validation(format!("Enter a valid weight, got '{}'", self.weight)))?;
        let date = parse_date(&self.date)
            .ok_or_else(|| Error::Validation(format!("Date must be YYYY-MM-DD, got '{}'", self.date)))?;
        Ok((weight, date))
    }

    /// Insert the record, then refresh the pet's cached weight.
    ///
    /// Only the insert can fail the call. The cached column takes the new
    /// weight unless a record dated later exists; a failure there is logged.
    pub async fn save(&self) -> Result<WeightRecord> {
        let (weight, date) = self.parsed()?;
        self.gateway.require_session()?;

        let record = WeightRecord {
            id: String::new(),
            pet_id: self.pet_id.clone(),
            weight,
            unit: self.unit,
            date,
            created_at: None,
        };

        let inserted = self
            .gateway
            .from(tables::WEIGHT_RECORDS)?
            .insert(vec![record.to_row()])
            .await?;

        let saved = serde_json::from_value::<Vec<WeightRecordRow>>(inserted)
            .ok()
            .and_then(|rows| rows.into_iter().next())
            .and_then(WeightRecord::from_row)
            .unwrap_or(record);

        if let Err(e) = self.sync_cached_weight(&saved).await {
            tracing::warn!(error = %e, pet = %self.pet_id, "cached weight not refreshed");
        }

        tracing::info!(pet = %self.pet_id, weight, "weight recorded");
        Ok(saved)
    }

    async fn sync_cached_weight(&self, saved: &WeightRecord) -> Result<()> {
        let rows = self
            .gateway
            .from(tables::WEIGHT_RECORDS)?
            .select("*")
            .eq("cat_id", &self.pet_id)
            .order("date", SortOrder::Ascending)
            .execute::<WeightRecordRow>()
            .await?;
        let mut records = records_from_rows(rows);
        sort_chronologically(&mut records);

        let weight = match records.last() {
            Some(latest) if latest.date > saved.date => latest.weight,
            _ => saved.weight,
        };

        self.gateway
            .from(tables::CATS)?
            .eq("id", &self.pet_id)
            .update(json!({ "weight": weight }))
            .await?;
        Ok(())
    }
}
