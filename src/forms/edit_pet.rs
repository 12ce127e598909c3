use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};
use crate::gateway::{tables, Gateway};
use crate::models::{parse_date, parse_decimal, ActivityLevel, Gender, Pet, PetRow};
use crate::remediation::RemediationDialog;

/// Number of distinct placeholder images
const PLACEHOLDER_VARIANTS: u32 = 16;

/// Asks the user to confirm a destructive action
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    New,
    Edit(String),
}

/// Raw form input, as typed
#[derive(Debug, Clone, PartialEq)]
pub struct PetForm {
    pub name: String,
    pub breed: String,
    pub gender: Gender,
    /// `YYYY-MM-DD` or empty
    pub birth_date: String,
    pub neutered: bool,
    pub weight: String,
    pub goal_weight: String,
    pub activity_level: ActivityLevel,
    /// Image already stored for the pet
    pub image_url: String,
}

impl Default for PetForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            breed: String::new(),
            gender: Gender::Male,
            birth_date: String::new(),
            neutered: false,
            weight: String::new(),
            goal_weight: String::new(),
            activity_level: ActivityLevel::Medium,
            image_url: String::new(),
        }
    }
}

impl PetForm {
    fn from_row(row: PetRow) -> Self {
        Self {
            name: row.name.unwrap_or_default(),
            breed: row.breed.unwrap_or_default(),
            gender: Gender::from_stored(row.gender.as_deref()),
            birth_date: row.birth_date.map(|d| d.to_string()).unwrap_or_default(),
            neutered: row.neutered.unwrap_or(false),
            weight: row.weight.map(|w| w.to_string()).unwrap_or_default(),
            goal_weight: row.goal_weight.map(|w| w.to_string()).unwrap_or_default(),
            activity_level: ActivityLevel::from_stored(row.activity_level.as_deref()),
            image_url: row.image_url.unwrap_or_default(),
        }
    }
}

/// A photo chosen but not uploaded yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub file_name: String,
    pub contents: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Row written; carries the id when the backend returned it
    Saved(Option<String>),
    /// Rejected by an access policy; nothing was written
    Remediation(RemediationDialog),
    /// Blocked before any request
    Invalid(String),
    NotAuthenticated,
    Failed(String),
}

/// Placeholder image reference: `<base>?image=<0..16>`
pub fn placeholder_image(base: &str) -> String {
    let n = rand::thread_rng().gen_range(0..PLACEHOLDER_VARIANTS);
    format!("{}?image={}", base, n)
}

fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

fn inserted_id(value: &Value) -> Option<String> {
    let row = match value {
        Value::Array(rows) => rows.first()?,
        other => other,
    };
    match row.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Create / edit pet form
pub struct EditPetController<'a> {
    gateway: &'a Gateway,
    mode: FormMode,
    pub form: PetForm,
    pending_image: Option<PendingImage>,
    /// What the image slot shows: a `data:` URI for a freshly chosen photo
    pub preview: Option<String>,
}

impl<'a> EditPetController<'a> {
    pub fn new_pet(gateway: &'a Gateway) -> Self {
        Self {
            gateway,
            mode: FormMode::New,
            form: PetForm::default(),
            pending_image: None,
            preview: None,
        }
    }

    /// Load an existing pet into the form
    pub async fn edit(gateway: &'a Gateway, id: &str) -> Result<Self> {
        let row = gateway
            .from(tables::CATS)?
            .select("*")
            .eq("id", id)
            .execute_one::<PetRow>()
            .await?
            .ok_or_else(|| Error::NotFound(format!("pet {}", id)))?;

        let form = PetForm::from_row(row);
        let preview = Some(form.image_url.clone()).filter(|url| !url.is_empty());

        Ok(Self {
            gateway,
            mode: FormMode::Edit(id.to_string()),
            form,
            pending_image: None,
            preview,
        })
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        self.pending_image.as_ref()
    }

    /// Hold a photo for upload and show it right away
    pub fn select_image(&mut self, file_name: &str, contents: Vec<u8>, content_type: Option<&str>) {
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(file_name).to_string());
        self.preview = Some(format!(
            "data:{};base64,{}",
            content_type,
            STANDARD.encode(&contents)
        ));
        self.pending_image = Some(PendingImage {
            file_name: file_name.to_string(),
            contents,
            content_type,
        });
    }

    pub fn validate(&self) -> Result<()> {
        if self.form.name.trim().is_empty() {
            return Err(Error::Validation("Please enter the cat's name.".to_string()));
        }
        let birth_date = self.form.birth_date.trim();
        if !birth_date.is_empty() && parse_date(birth_date).is_none() {
            return Err(Error::Validation(format!(
                "Birth date must be YYYY-MM-DD, got {}",
                birth_date
            )));
        }
        Ok(())
    }

    /// Entity built from the form, owned by `owner_id`
    pub fn to_pet(&self, owner_id: &str, image: Option<String>) -> Pet {
        let id = match &self.mode {
            FormMode::Edit(id) => id.clone(),
            FormMode::New => String::new(),
        };
        Pet {
            id,
            owner_id: Some(owner_id.to_string()),
            name: self.form.name.trim().to_string(),
            breed: self.form.breed.trim().to_string(),
            birth_date: parse_date(&self.form.birth_date),
            gender: self.form.gender,
            neutered: self.form.neutered,
            weight: parse_decimal(&self.form.weight),
            goal_weight: parse_decimal(&self.form.goal_weight),
            activity_level: self.form.activity_level,
            image: image.unwrap_or_else(|| self.form.image_url.clone()),
        }
    }

    /// Upload the pending photo (unless `ignore_image_errors`) and write the row.
    ///
    /// A policy rejection of the upload stops the save and returns the storage
    /// remediation dialog; other upload failures are logged and the pet is
    /// saved without the new photo.
    pub async fn save(&mut self, ignore_image_errors: bool) -> SaveOutcome {
        if let Err(e) = self.validate() {
            return SaveOutcome::Invalid(e.to_string());
        }
        let Ok(session) = self.gateway.require_session() else {
            return SaveOutcome::NotAuthenticated;
        };

        let mut uploaded: Option<String> = None;
        if let (Some(image), false) = (&self.pending_image, ignore_image_errors) {
            match self
                .gateway
                .upload_photo(&image.file_name, image.contents.clone(), Some(&image.content_type))
                .await
            {
                Ok(url) => uploaded = Some(url),
                Err(e) if e.kind() == ErrorKind::NotAuthorized => {
                    tracing::warn!(error = %e, "photo upload rejected by policy");
                    return SaveOutcome::Remediation(RemediationDialog::storage(
                        &self.gateway.config().photo_bucket,
                        e.user_message(),
                    ));
                }
                Err(e) => tracing::error!(error = %e, "photo upload failed, saving without it"),
            }
        }

        let mut pet = self.to_pet(session.user_id(), uploaded.clone());
        if self.mode == FormMode::New && pet.image.trim().is_empty() {
            pet.image = placeholder_image(&self.gateway.config().placeholder_image);
        }

        match self.write(&pet).await {
            Ok(id) => {
                self.pending_image = None;
                if let Some(url) = uploaded {
                    self.form.image_url = url;
                }
                tracing::info!(name = %pet.name, "pet saved");
                SaveOutcome::Saved(id)
            }
            Err(e) => {
                if let Some(url) = &uploaded {
                    self.discard_upload(url).await;
                }
                if e.kind() == ErrorKind::NotAuthorized {
                    tracing::warn!(error = %e, "pet write rejected by policy");
                    SaveOutcome::Remediation(RemediationDialog::database(e.user_message()))
                } else {
                    tracing::error!(error = %e, "error saving pet");
                    SaveOutcome::Failed(e.user_message())
                }
            }
        }
    }

    async fn write(&self, pet: &Pet) -> Result<Option<String>> {
        let row = pet.to_row();
        let table = self.gateway.from(tables::CATS)?;
        match &self.mode {
            FormMode::New => {
                let inserted = table.insert(vec![row]).await?;
                Ok(inserted_id(&inserted))
            }
            FormMode::Edit(id) => {
                table.eq("id", id).update(&row).await?;
                Ok(Some(id.clone()))
            }
        }
    }

    async fn discard_upload(&self, url: &str) {
        if let Err(e) = self.gateway.remove_photo(url).await {
            tracing::warn!(error = %e, %url, "could not remove orphaned photo");
        }
    }

    /// Delete the pet being edited once `confirm` agrees.
    ///
    /// Returns whether a delete was issued.
    pub async fn delete(&self, confirm: &dyn Confirm) -> Result<bool> {
        let FormMode::Edit(id) = &self.mode else {
            return Err(Error::Validation("Only saved pets can be deleted.".to_string()));
        };

        let prompt = format!("Delete {}? This cannot be undone.", self.form.name.trim());
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }

        self.gateway.from(tables::CATS)?.eq("id", id).delete().await?;
        tracing::info!(%id, "pet deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_is_never_empty() {
        for _ in 0..50 {
            let image = placeholder_image("https://placekitten.com/300/300");
            let n: u32 = image
                .strip_prefix("https://placekitten.com/300/300?image=")
                .unwrap()
                .parse()
                .unwrap();
            assert!(n < PLACEHOLDER_VARIANTS);
        }
    }

    #[test]
    fn inserted_id_reads_representation() {
        assert_eq!(inserted_id(&json!([{ "id": "c9" }])), Some("c9".to_string()));
        assert_eq!(inserted_id(&json!({ "id": 7 })), Some("7".to_string()));
        assert_eq!(inserted_id(&Value::Null), None);
        assert_eq!(inserted_id(&json!([])), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(guess_content_type("a.PNG"), "image/png");
        assert_eq!(guess_content_type("a"), "image/jpeg");
    }
}
