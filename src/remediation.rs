//! Corrective setup instructions shown when the backend rejects a write
//! on access-policy grounds.

use crate::gateway::tables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationKind {
    /// Photo upload rejected by the bucket policies
    Storage,
    /// Row write rejected by row-level security
    Database,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationDialog {
    pub kind: RemediationKind,
    pub title: String,
    pub message: String,
    /// What the backend said
    pub detail: String,
    /// SQL to run in the backend's SQL editor
    pub sql: String,
}

impl RemediationDialog {
    pub fn storage(bucket: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: RemediationKind::Storage,
            title: "Permission error (RLS)".to_string(),
            message: "The photo upload was blocked by the storage policies.".to_string(),
            detail: detail.into(),
            sql: storage_sql(bucket),
        }
    }

    pub fn database(detail: impl Into<String>) -> Self {
        Self {
            kind: RemediationKind::Database,
            title: "Permission error (RLS)".to_string(),
            message: "Saving was blocked by the database row-level security policies.".to_string(),
            detail: detail.into(),
            sql: database_sql(),
        }
    }

    /// Whether the user may retry the save without the photo
    pub fn allows_skip_image(&self) -> bool {
        self.kind == RemediationKind::Storage
    }
}

fn storage_sql(bucket: &str) -> String {
    format!(
        r#"-- Make the photo bucket public
insert into storage.buckets (id, name, public)
values ('{bucket}', '{bucket}', true)
on conflict (id) do update set public = true;

-- Drop old policies
drop policy if exists "Public Access" on storage.objects;
drop policy if exists "Allow Uploads" on storage.objects;
drop policy if exists "Allow Updates" on storage.objects;

-- Access policies
create policy "Public Access" on storage.objects for select using ( bucket_id = '{bucket}' );
create policy "Allow Uploads" on storage.objects for insert with check ( bucket_id = '{bucket}' );
create policy "Allow Updates" on storage.objects for update with check ( bucket_id = '{bucket}' );
"#
    )
}

fn database_sql() -> String {
    format!(
        r#"-- Drop old policies
drop policy if exists "Users can manage their own cats" on public.{cats};
drop policy if exists "Users can manage their own weight records" on public.{weights};
drop policy if exists "Users can manage their own reminders" on public.{reminders};
drop policy if exists "Users can manage their own profile" on public.{profiles};

-- Enable row-level security
alter table public.{cats} enable row level security;
alter table public.{weights} enable row level security;
alter table public.{reminders} enable row level security;
alter table public.{profiles} enable row level security;

-- Full access for the owner
create policy "Users can manage their own cats" on public.{cats} for all using (auth.uid() = owner_id);
create policy "Users can manage their own weight records" on public.{weights} for all using (auth.uid() = (select owner_id from public.{cats} where id = cat_id));
create policy "Users can manage their own reminders" on public.{reminders} for all using (auth.uid() = owner_id);
create policy "Users can manage their own profile" on public.{profiles} for all using (auth.uid() = id);

-- Heartbeat table
create table if not exists public.{keep_alive} (
  id uuid default uuid_generate_v4() primary key,
  created_at timestamp with time zone default timezone('utc'::text, now())
);
alter table public.{keep_alive} enable row level security;
drop policy if exists "Allow anonymous insert keep_alive" on public.{keep_alive};
drop policy if exists "Allow anonymous read keep_alive" on public.{keep_alive};
create policy "Allow anonymous insert keep_alive" on public.{keep_alive} for insert with check (true);
create policy "Allow anonymous read keep_alive" on public.{keep_alive} for select using (true);
"#,
        cats = tables::CATS,
        weights = tables::WEIGHT_RECORDS,
        reminders = tables::REMINDERS,
        profiles = tables::PROFILES,
        keep_alive = tables::KEEP_ALIVE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_dialog_names_the_bucket() {
        let dialog = RemediationDialog::storage("pet-pics", "new row violates row-level security policy");
        assert!(dialog.allows_skip_image());
        assert!(dialog.sql.contains("values ('pet-pics', 'pet-pics', true)"));
        assert!(!dialog.sql.contains("cat-photos"));
    }

    #[test]
    fn database_dialog_covers_every_table() {
        let dialog = RemediationDialog::database("denied");
        assert!(!dialog.allows_skip_image());
        for table in ["cats", "weight_records", "reminders", "profiles", "keep_alive"] {
            assert!(
                dialog.sql.contains(&format!("alter table public.{} enable row level security", table)),
                "{} missing",
                table
            );
        }
    }
}
