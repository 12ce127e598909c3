//! Per-screen state: fetch, derive, expose

mod pet_detail;
mod pets;
mod profile;
mod reminders;

pub use pet_detail::{DetailState, PetDetail, PetDetailView};
pub use pets::{compute_trend, goal_progress, group_by_pet, GoalProgress, PetListView, PetSummary};
pub use profile::{PetThumbnail, ProfileView};
pub use reminders::ReminderListView;

pub(crate) use profile::fetch_account;
