use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::numeric::{lenient_date, lenient_f64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// Spelling kept in the `gender` column
    pub fn as_stored(self) -> &'static str {
        match self {
            Gender::Male => "Macho",
            Gender::Female => "Fêmea",
        }
    }

    /// Map a stored value; unknown or missing values are [`Gender::Male`]
    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "macho" | "male" | "m" => Ok(Gender::Male),
            "fêmea" | "femea" | "female" | "f" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ActivityLevel {
    pub fn as_stored(self) -> &'static str {
        match self {
            ActivityLevel::Low => "Baixo",
            ActivityLevel::Medium => "Médio",
            ActivityLevel::High => "Alto",
        }
    }

    /// Map a stored value; unknown or missing values are [`ActivityLevel::Medium`]
    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for ActivityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baixo" | "low" => Ok(ActivityLevel::Low),
            "médio" | "medio" | "medium" => Ok(ActivityLevel::Medium),
            "alto" | "high" => Ok(ActivityLevel::High),
            other => Err(format!("unknown activity level: {}", other)),
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

/// Direction of the two most recent weight records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

/// A `cats` row as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PetRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub neutered: Option<bool>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub goal_weight: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A tracked animal
#[derive(Debug, Clone, PartialEq)]
pub struct Pet {
    pub id: String,
    pub owner_id: Option<String>,
    pub name: String,
    /// Empty when unknown
    pub breed: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub neutered: bool,
    /// Cached current weight
    pub weight: Option<f64>,
    pub goal_weight: Option<f64>,
    pub activity_level: ActivityLevel,
    pub image: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Pet {
    /// Map a stored row; a missing image becomes `placeholder_image`
    pub fn from_row(row: PetRow, placeholder_image: &str) -> Self {
        Self {
            id: row.id.unwrap_or_default(),
            owner_id: row.owner_id,
            name: row.name.unwrap_or_default(),
            breed: row.breed.unwrap_or_default(),
            birth_date: row.birth_date,
            gender: Gender::from_stored(row.gender.as_deref()),
            neutered: row.neutered.unwrap_or(false),
            weight: row.weight,
            goal_weight: row.goal_weight,
            activity_level: ActivityLevel::from_stored(row.activity_level.as_deref()),
            image: non_empty(row.image_url).unwrap_or_else(|| placeholder_image.to_string()),
        }
    }

    /// Persisted shape. The name is trimmed; a blank breed or image is null.
    pub fn to_row(&self) -> PetRow {
        PetRow {
            id: Some(self.id.clone()).filter(|id| !id.is_empty()),
            owner_id: self.owner_id.clone(),
            name: Some(self.name.trim().to_string()),
            breed: non_empty(Some(self.breed.clone())),
            birth_date: self.birth_date,
            gender: Some(self.gender.as_stored().to_string()),
            neutered: Some(self.neutered),
            weight: self.weight,
            goal_weight: self.goal_weight,
            activity_level: Some(self.activity_level.as_stored().to_string()),
            image_url: non_empty(Some(self.image.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLACEHOLDER: &str = "https://placekitten.com/200/200";

    #[test]
    fn null_goal_weight_stays_absent() {
        let row: PetRow = serde_json::from_value(json!({
            "id": "c1",
            "owner_id": "u1",
            "name": "Frajola",
            "weight": "5,2",
            "goal_weight": null
        }))
        .unwrap();

        let pet = Pet::from_row(row, PLACEHOLDER);
        assert_eq!(pet.weight, Some(5.2));
        assert_eq!(pet.goal_weight, None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let pet = Pet::from_row(
            serde_json::from_value(json!({ "id": "c1", "gender": "Unknown", "image_url": "" })).unwrap(),
            PLACEHOLDER,
        );

        assert_eq!(pet.name, "");
        assert_eq!(pet.breed, "");
        assert_eq!(pet.gender, Gender::Male);
        assert_eq!(pet.activity_level, ActivityLevel::Medium);
        assert!(!pet.neutered);
        assert_eq!(pet.image, PLACEHOLDER);
    }

    #[test]
    fn stored_spellings() {
        let pet = Pet::from_row(
            serde_json::from_value(json!({
                "id": "c2",
                "gender": "Fêmea",
                "activity_level": "Alto",
                "birth_date": "2021-03-04"
            }))
            .unwrap(),
            PLACEHOLDER,
        );
        assert_eq!(pet.gender, Gender::Female);
        assert_eq!(pet.activity_level, ActivityLevel::High);
        assert_eq!(pet.birth_date, NaiveDate::from_ymd_opt(2021, 3, 4));

        let row = serde_json::to_value(pet.to_row()).unwrap();
        assert_eq!(row["gender"], "Fêmea");
        assert_eq!(row["activity_level"], "Alto");
        assert_eq!(row["birth_date"], "2021-03-04");
        assert_eq!(row["breed"], serde_json::Value::Null);
    }

    #[test]
    fn to_row_trims_name_and_skips_blank_id() {
        let pet = Pet {
            id: String::new(),
            owner_id: Some("u1".to_string()),
            name: "  Frajola ".to_string(),
            breed: " ".to_string(),
            birth_date: None,
            gender: Gender::Male,
            neutered: true,
            weight: Some(5.2),
            goal_weight: Some(5.0),
            activity_level: ActivityLevel::Low,
            image: String::new(),
        };

        let row = serde_json::to_value(pet.to_row()).unwrap();
        assert!(row.get("id").is_none());
        assert_eq!(row["owner_id"], "u1");
        assert_eq!(row["name"], "Frajola");
        assert_eq!(row["breed"], serde_json::Value::Null);
        assert_eq!(row["image_url"], serde_json::Value::Null);
        assert_eq!(row["goal_weight"], 5.0);
    }

    #[test]
    fn parse_user_spellings() {
        assert_eq!("female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("Femea".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("medio".parse::<ActivityLevel>(), Ok(ActivityLevel::Medium));
        assert!("lazy".parse::<ActivityLevel>().is_err());
    }
}
