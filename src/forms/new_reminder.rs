use crate::error::{Error, Result};
use crate::gateway::{tables, Gateway};
use crate::models::{parse_date, Reminder, ReminderCategory, ReminderRow};

/// New health reminder for the signed-in account
pub struct NewReminderController<'a> {
    gateway: &'a Gateway,
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub category: ReminderCategory,
}

impl<'a> NewReminderController<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self {
            gateway,
            title: String::new(),
            date: String::new(),
            category: ReminderCategory::Vaccine,
        }
    }

    pub async fn save(&self) -> Result<Reminder> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title is required.".to_string()));
        }
        if self.date.trim().is_empty() {
            return Err(Error::Validation("Date is required.".to_string()));
        }
        let date = parse_date(&self.date)
            .ok_or_else(|| Error::Validation(format!("Date must be YYYY-MM-DD, got '{}'", self.date)))?;

        let session = self.gateway.require_session()?;
        let reminder = Reminder {
            id: String::new(),
            owner_id: Some(session.user_id().to_string()),
            title: self.title.trim().to_string(),
            date: Some(date),
            category: self.category,
            completed: false,
        };

        let inserted = self
            .gateway
            .from(tables::REMINDERS)?
            .insert(vec![reminder.to_row()])
            .await?;

        let saved = serde_json::from_value::<Vec<ReminderRow>>(inserted)
            .ok()
            .and_then(|rows| rows.into_iter().next())
            .map(Reminder::from_row)
            .unwrap_or(reminder);
        tracing::info!(title = %saved.title, "reminder created");
        Ok(saved)
    }
}
