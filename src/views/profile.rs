use crate::error::Result;
use crate::gateway::{tables, Gateway};
use crate::models::{Account, PetRow, ProfileRow};

/// Profile row for `user_id`, if one exists
pub(crate) async fn fetch_account(gateway: &Gateway, user_id: &str) -> Result<Option<Account>> {
    let row = gateway
        .from(tables::PROFILES)?
        .select("*")
        .eq("id", user_id)
        .execute_one::<ProfileRow>()
        .await?;
    Ok(row.map(Account::from_row))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PetThumbnail {
    pub id: String,
    pub name: String,
    pub image: String,
}

/// Account summary with pet thumbnails and record counts
pub struct ProfileView<'a> {
    gateway: &'a Gateway,
    pub account: Option<Account>,
    pub pets: Vec<PetThumbnail>,
    pub weight_record_count: usize,
    pub reminder_count: usize,
}

impl<'a> ProfileView<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self {
            gateway,
            account: None,
            pets: Vec::new(),
            weight_record_count: 0,
            reminder_count: 0,
        }
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let session = self.gateway.require_session()?;
        let user_id = session.user_id();

        // Accounts created before the profiles trigger have no row
        self.account = Some(fetch_account(self.gateway, user_id).await?.unwrap_or_else(|| {
            Account {
                id: user_id.to_string(),
                name: String::new(),
                email: session.user.email.clone().unwrap_or_default(),
                avatar: None,
            }
        }));

        let placeholder = &self.gateway.config().placeholder_image;
        self.pets = self
            .gateway
            .from(tables::CATS)?
            .select("id,name,image_url")
            .eq("owner_id", user_id)
            .execute::<PetRow>()
            .await?
            .into_iter()
            .map(|row| PetThumbnail {
                id: row.id.unwrap_or_default(),
                name: row.name.unwrap_or_default(),
                image: row
                    .image_url
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| placeholder.clone()),
            })
            .collect();

        self.weight_record_count = self
            .gateway
            .from(tables::WEIGHT_RECORDS)?
            .select("*")
            .count()
            .await?;

        self.reminder_count = self
            .gateway
            .from(tables::REMINDERS)?
            .select("*")
            .eq("owner_id", user_id)
            .count()
            .await?;

        Ok(())
    }
}
