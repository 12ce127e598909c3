use cura4pif_postgrest::SortOrder;

use super::pets::{compute_trend, goal_progress, GoalProgress};
use crate::error::Result;
use crate::gateway::{tables, Gateway};
use crate::models::{
    records_from_rows, sort_chronologically, Pet, PetRow, Trend, WeightRecord, WeightRecordRow,
};

/// A pet with its full weight history
#[derive(Debug, Clone, PartialEq)]
pub struct PetDetail {
    pub pet: Pet,
    /// Oldest first, ready for charting
    pub history: Vec<WeightRecord>,
}

impl PetDetail {
    pub fn latest(&self) -> Option<&WeightRecord> {
        self.history.last()
    }

    /// Latest recorded weight, or the cached column when there is no history
    pub fn current_weight(&self) -> Option<f64> {
        self.latest().map(|r| r.weight).or(self.pet.weight)
    }

    pub fn trend(&self) -> Trend {
        let newest_first: Vec<WeightRecord> = self.history.iter().rev().cloned().collect();
        compute_trend(&newest_first)
    }

    pub fn goal_progress(&self) -> Option<GoalProgress> {
        goal_progress(self.current_weight(), self.pet.goal_weight)
    }

    /// Difference between the first and latest record
    pub fn total_change(&self) -> Option<f64> {
        match (self.history.first(), self.history.last()) {
            (Some(first), Some(last)) if self.history.len() > 1 => Some(last.weight - first.weight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Found(PetDetail),
    NotFound,
}

/// Detail and progress screens for one pet
pub struct PetDetailView<'a> {
    gateway: &'a Gateway,
    pet_id: String,
    pub state: DetailState,
}

impl<'a> PetDetailView<'a> {
    pub fn new(gateway: &'a Gateway, pet_id: &str) -> Self {
        Self {
            gateway,
            pet_id: pet_id.to_string(),
            state: DetailState::Loading,
        }
    }

    pub fn pet_id(&self) -> &str {
        &self.pet_id
    }

    /// Fetch the pet and its history. Any failure ends in `NotFound`.
    pub async fn load(&mut self) -> Result<&DetailState> {
        self.state = DetailState::Loading;
        match self.fetch().await {
            Ok(Some(detail)) => self.state = DetailState::Found(detail),
            Ok(None) => self.state = DetailState::NotFound,
            Err(e) => {
                tracing::error!(error = %e, pet = %self.pet_id, "error fetching pet");
                self.state = DetailState::NotFound;
                return Err(e);
            }
        }
        Ok(&self.state)
    }

    async fn fetch(&self) -> Result<Option<PetDetail>> {
        let row = self
            .gateway
            .from(tables::CATS)?
            .select("*")
            .eq("id", &self.pet_id)
            .execute_one::<PetRow>()
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let rows = self
            .gateway
            .from(tables::WEIGHT_RECORDS)?
            .select("*")
            .eq("cat_id", &self.pet_id)
            .order("date", SortOrder::Ascending)
            .execute::<WeightRecordRow>()
            .await?;

        let mut history = records_from_rows(rows);
        sort_chronologically(&mut history);

        Ok(Some(PetDetail {
            pet: Pet::from_row(row, &self.gateway.config().placeholder_image),
            history,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, Gender, WeightUnit};
    use chrono::NaiveDate;

    fn detail(cached: Option<f64>, weights: &[(u32, f64)]) -> PetDetail {
        PetDetail {
            pet: Pet {
                id: "c1".to_string(),
                owner_id: None,
                name: "Frajola".to_string(),
                breed: String::new(),
                birth_date: None,
                gender: Gender::Male,
                neutered: false,
                weight: cached,
                goal_weight: Some(5.0),
                activity_level: ActivityLevel::Medium,
                image: String::new(),
            },
            history: weights
                .iter()
                .map(|(day, weight)| WeightRecord {
                    id: format!("w{}", day),
                    pet_id: "c1".to_string(),
                    weight: *weight,
                    unit: WeightUnit::Kg,
                    date: NaiveDate::from_ymd_opt(2024, 8, *day).unwrap(),
                    created_at: None,
                })
                .collect(),
        }
    }

    #[test]
    fn current_weight_prefers_history() {
        assert_eq!(detail(Some(5.2), &[(1, 4.8), (2, 4.9)]).current_weight(), Some(4.9));
        assert_eq!(detail(Some(5.2), &[]).current_weight(), Some(5.2));
        assert_eq!(detail(None, &[]).current_weight(), None);
    }

    #[test]
    fn trend_and_change() {
        let d = detail(None, &[(1, 5.1), (2, 4.8), (3, 4.6)]);
        assert_eq!(d.trend(), Trend::Down);
        assert!((d.total_change().unwrap() + 0.5).abs() < 1e-9);
        assert_eq!(detail(None, &[(1, 5.1)]).total_change(), None);
    }
}
