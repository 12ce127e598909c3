use serde_json::json;

use crate::error::{Error, Result};
use crate::gateway::{tables, Gateway};
use crate::views::fetch_account;

/// Rename the signed-in account
pub struct ProfileEditController<'a> {
    gateway: &'a Gateway,
    pub name: String,
}

impl<'a> ProfileEditController<'a> {
    /// Prefill the name from the stored profile
    pub async fn load(gateway: &'a Gateway) -> Result<Self> {
        let session = gateway.require_session()?;
        let name = fetch_account(gateway, session.user_id())
            .await?
            .map(|account| account.name)
            .unwrap_or_default();
        Ok(Self { gateway, name })
    }

    pub async fn save(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Name cannot be empty.".to_string()));
        }
        let session = self.gateway.require_session()?;
        self.gateway
            .from(tables::PROFILES)?
            .eq("id", session.user_id())
            .update(json!({ "name": name }))
            .await?;
        Ok(())
    }
}
