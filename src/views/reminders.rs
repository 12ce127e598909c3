use cura4pif_postgrest::SortOrder;

use crate::error::{Error, Result};
use crate::forms::{Notice, Pending, ReminderToggle};
use crate::gateway::{tables, Gateway};
use crate::models::{Reminder, ReminderRow};

/// The signed-in account's reminders, soonest first
pub struct ReminderListView<'a> {
    gateway: &'a Gateway,
    pub loading: bool,
    pub reminders: Vec<Reminder>,
    pub error: Option<String>,
}

impl<'a> ReminderListView<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self {
            gateway,
            loading: false,
            reminders: Vec::new(),
            error: None,
        }
    }

    /// Fetch reminders. On failure the list is left empty with `error` set.
    pub async fn refresh(&mut self) -> Result<()> {
        self.loading = true;
        let result = self.fetch().await;
        self.loading = false;

        match result {
            Ok(reminders) => {
                self.reminders = reminders;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "error fetching reminders");
                self.reminders.clear();
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<Reminder>> {
        let session = self.gateway.require_session()?;
        let rows = self
            .gateway
            .from(tables::REMINDERS)?
            .select("*")
            .eq("owner_id", session.user_id())
            .order("date", SortOrder::Ascending)
            .execute::<ReminderRow>()
            .await?;
        Ok(rows.into_iter().map(Reminder::from_row).collect())
    }

    pub fn get(&self, id: &str) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id == id)
    }

    /// Flip the completed flag locally; the returned commit must be settled
    pub fn begin_toggle(&mut self, id: &str) -> Result<Pending<ReminderToggle>> {
        let completed = !self
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("reminder {}", id)))?
            .completed;
        let command = ReminderToggle::new(id, completed, self.gateway.from(tables::REMINDERS)?);
        Ok(Pending::start(command, &mut self.reminders))
    }

    /// Toggle a reminder; a failed update is rolled back and reported as a notice
    pub async fn toggle(&mut self, id: &str) -> Result<Option<Notice>> {
        let pending = self.begin_toggle(id)?;
        Ok(pending.settle(&mut self.reminders).await)
    }

    /// Open reminders first, each group soonest first
    pub fn pending_first(&self) -> Vec<&Reminder> {
        let mut sorted: Vec<&Reminder> = self.reminders.iter().collect();
        sorted.sort_by_key(|r| r.completed);
        sorted
    }
}
