//! Form and mutation controllers

mod auth;
mod edit_pet;
mod new_reminder;
pub mod optimistic;
mod profile_edit;
mod reminder_toggle;
mod weight_entry;

pub use auth::{AuthController, AuthMode, AuthOutcome};
pub use edit_pet::{Confirm, EditPetController, FormMode, PendingImage, PetForm, SaveOutcome};
pub use new_reminder::NewReminderController;
pub use optimistic::{run_optimistic, OptimisticCommand, Pending};
pub use profile_edit::ProfileEditController;
pub use reminder_toggle::ReminderToggle;
pub use weight_entry::WeightEntryController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    /// Shown briefly, nothing for the user to do
    Transient,
    Error,
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Transient,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
