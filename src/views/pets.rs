use chrono::NaiveDate;
use cura4pif_postgrest::SortOrder;
use std::collections::HashMap;

use super::profile::fetch_account;
use crate::error::Result;
use crate::gateway::{tables, Gateway};
use crate::models::{
    records_from_rows, sort_chronologically, Pet, PetRow, Trend, WeightRecord, WeightRecordRow,
};

/// Fill and goal-marker positions of the progress bar, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    pub fill_percent: f64,
    pub marker_percent: f64,
}

/// Progress towards the goal weight.
///
/// The bar's scale is the larger of the current weight and 120% of the goal.
/// `None` unless both weights are present and positive.
pub fn goal_progress(weight: Option<f64>, goal: Option<f64>) -> Option<GoalProgress> {
    let weight = weight.filter(|w| *w > 0.0)?;
    let goal = goal.filter(|g| *g > 0.0)?;
    let scale = weight.max(goal * 1.2);
    Some(GoalProgress {
        fill_percent: (weight / scale * 100.0).min(100.0),
        marker_percent: (goal / scale * 100.0).min(100.0),
    })
}

/// Trend from records sorted newest first
pub fn compute_trend(newest_first: &[WeightRecord]) -> Trend {
    match newest_first {
        [latest, previous, ..] if latest.weight > previous.weight => Trend::Up,
        [latest, previous, ..] if latest.weight < previous.weight => Trend::Down,
        _ => Trend::Stable,
    }
}

/// Group records by pet, each group sorted newest first.
///
/// Same-day records without a creation time count the later-returned one as newer.
pub fn group_by_pet(records: Vec<WeightRecord>) -> HashMap<String, Vec<WeightRecord>> {
    let mut groups: HashMap<String, Vec<WeightRecord>> = HashMap::new();
    for record in records {
        groups.entry(record.pet_id.clone()).or_default().push(record);
    }
    for group in groups.values_mut() {
        sort_chronologically(group);
        group.reverse();
    }
    groups
}

/// One entry of the pet list
#[derive(Debug, Clone, PartialEq)]
pub struct PetSummary {
    pub pet: Pet,
    pub trend: Trend,
    /// Latest recorded weight, or the cached column when there is no history
    pub current_weight: Option<f64>,
    pub last_weighed: Option<NaiveDate>,
}

impl PetSummary {
    /// Build from a pet and its records sorted newest first
    pub fn new(pet: Pet, newest_first: &[WeightRecord]) -> Self {
        let latest = newest_first.first();
        Self {
            trend: compute_trend(newest_first),
            current_weight: latest.map(|r| r.weight).or(pet.weight),
            last_weighed: latest.map(|r| r.date),
            pet,
        }
    }

    pub fn goal_progress(&self) -> Option<GoalProgress> {
        goal_progress(self.current_weight, self.pet.goal_weight)
    }
}

/// The signed-in account's pets with their weight trends
pub struct PetListView<'a> {
    gateway: &'a Gateway,
    pub loading: bool,
    pub pets: Vec<PetSummary>,
    /// First name for the greeting
    pub greeting_name: Option<String>,
    pub error: Option<String>,
}

impl<'a> PetListView<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self {
            gateway,
            loading: false,
            pets: Vec::new(),
            greeting_name: None,
            error: None,
        }
    }

    /// Fetch pets and weight history.
    ///
    /// On failure the list is left empty with `error` set; nothing is retried.
    pub async fn refresh(&mut self) -> Result<()> {
        self.loading = true;
        let result = self.fetch().await;
        self.loading = false;

        match result {
            Ok(pets) => {
                self.pets = pets;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "error fetching pets");
                self.pets.clear();
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn fetch(&mut self) -> Result<Vec<PetSummary>> {
        let session = self.gateway.require_session()?;

        self.greeting_name = self.fetch_greeting(session.user_id()).await;

        let rows = self
            .gateway
            .from(tables::CATS)?
            .select("*")
            .eq("owner_id", session.user_id())
            .order("name", SortOrder::Ascending)
            .execute::<PetRow>()
            .await?;

        let records = self
            .gateway
            .from(tables::WEIGHT_RECORDS)?
            .select("*")
            .order("date", SortOrder::Ascending)
            .execute::<WeightRecordRow>()
            .await?;
        let groups = group_by_pet(records_from_rows(records));

        let placeholder = &self.gateway.config().placeholder_image;
        let mut pets: Vec<PetSummary> = rows
            .into_iter()
            .map(|row| {
                let pet = Pet::from_row(row, placeholder);
                let history = groups.get(&pet.id).map(Vec::as_slice).unwrap_or_default();
                PetSummary::new(pet, history)
            })
            .collect();
        pets.sort_by_key(|summary| summary.pet.name.to_lowercase());

        tracing::debug!(count = pets.len(), "pets loaded");
        Ok(pets)
    }

    async fn fetch_greeting(&self, user_id: &str) -> Option<String> {
        match fetch_account(self.gateway, user_id).await {
            Ok(account) => account.and_then(|a| a.first_name().map(str::to_string)),
            Err(e) => {
                tracing::debug!(error = %e, "profile unavailable for greeting");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, Gender, WeightUnit};

    fn record(pet: &str, date: &str, weight: f64) -> WeightRecord {
        WeightRecord {
            id: format!("{}-{}", pet, date),
            pet_id: pet.to_string(),
            weight,
            unit: WeightUnit::Kg,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            created_at: None,
        }
    }

    fn pet_with_cached(weight: Option<f64>) -> Pet {
        Pet {
            id: "c1".to_string(),
            owner_id: Some("u1".to_string()),
            name: "Mingau".to_string(),
            breed: String::new(),
            birth_date: None,
            gender: Gender::Female,
            neutered: true,
            weight,
            goal_weight: None,
            activity_level: ActivityLevel::Medium,
            image: String::new(),
        }
    }

    #[test]
    fn trend_compares_the_two_latest_records() {
        let up = group_by_pet(vec![
            record("c1", "2024-07-01", 4.8),
            record("c1", "2024-08-01", 4.9),
        ]);
        assert_eq!(compute_trend(&up["c1"]), Trend::Up);

        let down = group_by_pet(vec![
            record("c1", "2024-08-01", 4.7),
            record("c1", "2024-07-01", 4.8),
            record("c1", "2024-06-01", 4.1),
        ]);
        assert_eq!(compute_trend(&down["c1"]), Trend::Down);

        let flat = group_by_pet(vec![
            record("c1", "2024-07-01", 4.8),
            record("c1", "2024-08-01", 4.8),
        ]);
        assert_eq!(compute_trend(&flat["c1"]), Trend::Stable);
    }

    #[test]
    fn fewer_than_two_records_is_stable() {
        assert_eq!(compute_trend(&[]), Trend::Stable);
        assert_eq!(compute_trend(&[record("c1", "2024-08-01", 5.0)]), Trend::Stable);
    }

    #[test]
    fn groups_are_kept_apart() {
        let groups = group_by_pet(vec![
            record("c1", "2024-07-01", 4.8),
            record("c2", "2024-07-02", 3.0),
            record("c1", "2024-08-01", 4.9),
        ]);
        assert_eq!(groups["c1"].len(), 2);
        assert_eq!(groups["c1"][0].weight, 4.9);
        assert_eq!(groups["c2"].len(), 1);
    }

    #[test]
    fn same_day_record_returned_last_is_current() {
        let groups = group_by_pet(vec![
            record("c1", "2024-07-01", 5.0),
            record("c1", "2024-08-01", 5.2),
            record("c1", "2024-08-01", 4.9),
        ]);
        let summary = PetSummary::new(pet_with_cached(Some(5.2)), &groups["c1"]);
        assert_eq!(summary.current_weight, Some(4.9));
        assert_eq!(summary.trend, Trend::Down);
    }

    #[test]
    fn goal_progress_scale() {
        // goal * 1.2 = 6.0 dominates
        let progress = goal_progress(Some(4.5), Some(5.0)).unwrap();
        assert!((progress.fill_percent - 75.0).abs() < 1e-9);
        assert!((progress.marker_percent - 83.333_333_333).abs() < 1e-6);

        // weight dominates
        let progress = goal_progress(Some(8.0), Some(5.0)).unwrap();
        assert!((progress.fill_percent - 100.0).abs() < 1e-9);
        assert!((progress.marker_percent - 62.5).abs() < 1e-9);

        assert_eq!(goal_progress(Some(5.0), None), None);
        assert_eq!(goal_progress(None, Some(5.0)), None);
        assert_eq!(goal_progress(Some(5.0), Some(0.0)), None);
    }
}
