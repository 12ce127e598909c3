use serde::{Deserialize, Serialize};

/// A `profiles` row as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The signed-in account
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl Account {
    pub fn from_row(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            avatar: row.avatar_url.filter(|url| !url.trim().is_empty()),
        }
    }

    /// First word of the display name, used in greetings
    pub fn first_name(&self) -> Option<&str> {
        self.name.split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_name() {
        let account = Account::from_row(ProfileRow {
            id: "u1".to_string(),
            name: Some("Ana Maria Souza".to_string()),
            email: None,
            avatar_url: Some(" ".to_string()),
        });
        assert_eq!(account.first_name(), Some("Ana"));
        assert_eq!(account.email, "");
        assert_eq!(account.avatar, None);

        let unnamed = Account::from_row(ProfileRow {
            id: "u2".to_string(),
            ..ProfileRow::default()
        });
        assert_eq!(unnamed.first_name(), None);
    }
}
