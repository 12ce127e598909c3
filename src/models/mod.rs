//! Backend rows and the in-memory entities they map to

pub mod numeric;
mod pet;
mod profile;
mod reminder;
mod weight;

pub use numeric::{parse_date, parse_decimal, parse_timestamp};
pub use pet::{ActivityLevel, Gender, Pet, PetRow, Trend};
pub use profile::{Account, ProfileRow};
pub use reminder::{Reminder, ReminderCategory, ReminderRow};
pub use weight::{
    records_from_rows, sort_chronologically, WeightRecord, WeightRecordRow, WeightUnit,
};
