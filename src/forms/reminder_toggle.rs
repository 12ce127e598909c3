use async_trait::async_trait;
use cura4pif_postgrest::PostgrestClient;
use serde_json::json;

use super::optimistic::OptimisticCommand;
use crate::error::Result;
use crate::models::Reminder;

/// Flip a reminder's completed flag
pub struct ReminderToggle {
    id: String,
    completed: bool,
    client: PostgrestClient,
}

impl ReminderToggle {
    /// `completed` is the value after the toggle; `client` targets the reminders table
    pub fn new(id: &str, completed: bool, client: PostgrestClient) -> Self {
        Self {
            id: id.to_string(),
            completed,
            client,
        }
    }

    fn set(&self, reminders: &mut [Reminder], completed: bool) {
        if let Some(reminder) = reminders.iter_mut().find(|r| r.id == self.id) {
            reminder.completed = completed;
        }
    }
}

#[async_trait]
impl OptimisticCommand for ReminderToggle {
    type State = Vec<Reminder>;

    fn apply(&self, state: &mut Vec<Reminder>) {
        self.set(state, self.completed);
    }

    fn revert(&self, state: &mut Vec<Reminder>) {
        self.set(state, !self.completed);
    }

    async fn commit(&self) -> Result<()> {
        self.client
            .clone()
            .eq("id", &self.id)
            .update(json!({ "completed": self.completed }))
            .await?;
        Ok(())
    }

    fn describe(&self) -> String {
        "update the reminder".to_string()
    }
}
