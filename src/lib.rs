//! Cura4Pif: pet health tracking on top of a Supabase backend
//!
//! Cats, their weight history, health reminders and the account profile,
//! reached through a single [`Gateway`](gateway::Gateway) built from an
//! explicit [`AppConfig`](config::AppConfig).
//!
//! ```no_run
//! use cura4pif::prelude::*;
//!
//! # async fn run() -> cura4pif::error::Result<()> {
//! let gateway = Gateway::new(AppConfig::from_env()?)?;
//! gateway.sign_in("ana@example.com", "secret").await?;
//!
//! let mut pets = PetListView::new(&gateway);
//! pets.refresh().await?;
//! for summary in &pets.pets {
//!     println!("{} {:?}", summary.pet.name, summary.trend);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod heartbeat;
pub mod models;
pub mod remediation;
pub mod render;
pub mod views;

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::forms::{
        AuthController, AuthMode, AuthOutcome, EditPetController, NewReminderController, Notice,
        ProfileEditController, SaveOutcome, WeightEntryController,
    };
    pub use crate::gateway::Gateway;
    pub use crate::models::{Pet, Reminder, Trend, WeightRecord};
    pub use crate::views::{DetailState, PetDetailView, PetListView, ProfileView, ReminderListView};
}
