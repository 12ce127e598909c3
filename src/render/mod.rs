//! Plain-text rendering for the terminal

mod chart;

pub use chart::area_chart;

use std::fmt::Write as _;

use crate::forms::{Notice, NoticeLevel};
use crate::models::{Gender, Reminder, ReminderCategory, Trend};
use crate::remediation::RemediationDialog;
use crate::views::{GoalProgress, PetDetail, PetSummary, ProfileView};

/// Breed shown when none was entered (sem raça definida)
pub const UNKNOWN_BREED: &str = "SRD";

pub fn gender_badge(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "♂",
        Gender::Female => "♀",
    }
}

pub fn trend_glyph(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "↑",
        Trend::Down => "↓",
        Trend::Stable => "–",
    }
}

pub fn format_weight(weight: Option<f64>) -> String {
    match weight {
        Some(w) => format!("{:.1} kg", w),
        None => "--".to_string(),
    }
}

fn breed(breed: &str) -> &str {
    if breed.trim().is_empty() {
        UNKNOWN_BREED
    } else {
        breed
    }
}

/// `[#######.....|...]` with `|` at the goal
pub fn progress_bar(progress: GoalProgress, width: usize) -> String {
    let width = width.max(2);
    let fill = ((progress.fill_percent / 100.0) * width as f64).round() as usize;
    let marker = (((progress.marker_percent / 100.0) * width as f64).round() as usize).min(width - 1);
    let bar: String = (0..width)
        .map(|i| {
            if i == marker {
                '|'
            } else if i < fill {
                '#'
            } else {
                '.'
            }
        })
        .collect();
    format!("[{}]", bar)
}

pub fn pet_card(summary: &PetSummary) -> String {
    let pet = &summary.pet;
    let mut out = format!(
        "{} {}  ({})\n  {}  {}",
        gender_badge(pet.gender),
        pet.name,
        breed(&pet.breed),
        format_weight(summary.current_weight),
        trend_glyph(summary.trend),
    );
    if let Some(goal) = pet.goal_weight {
        let _ = write!(out, "  goal {}", format_weight(Some(goal)));
    }
    if let Some(progress) = summary.goal_progress() {
        let _ = write!(out, "\n  {}", progress_bar(progress, 24));
    }
    out
}

pub fn pet_list(greeting_name: Option<&str>, pets: &[PetSummary]) -> String {
    let mut out = match greeting_name {
        Some(name) => format!("Hello, {}\n", name),
        None => "Welcome\n".to_string(),
    };
    out.push_str("My cats\n\n");
    if pets.is_empty() {
        out.push_str("No cats yet. Add one with `cura4pif pets add`.");
        return out;
    }
    let cards: Vec<String> = pets
        .iter()
        .map(|summary| format!("{}\n  id: {}", pet_card(summary), summary.pet.id))
        .collect();
    out.push_str(&cards.join("\n\n"));
    out
}

pub fn pet_detail(detail: &PetDetail) -> String {
    let pet = &detail.pet;
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", gender_badge(pet.gender), pet.name);
    let _ = writeln!(out, "{}", breed(&pet.breed));
    let _ = writeln!(out, "Photo: {}", pet.image);
    let _ = writeln!(out);

    let _ = writeln!(out, "Basic information");
    let _ = writeln!(out, "  Gender:      {}", pet.gender);
    let _ = writeln!(
        out,
        "  Birth date:  {}",
        pet.birth_date.map(|d| d.to_string()).unwrap_or_else(|| "--".to_string())
    );
    let _ = writeln!(out, "  Neutered:    {}", if pet.neutered { "Yes" } else { "No" });
    let _ = writeln!(out, "  Activity:    {}", pet.activity_level);
    let _ = writeln!(out);

    let _ = writeln!(out, "Weight");
    let _ = writeln!(
        out,
        "  Current:     {} {}",
        format_weight(detail.current_weight()),
        trend_glyph(detail.trend())
    );
    let _ = writeln!(out, "  Goal:        {}", format_weight(pet.goal_weight));
    if let Some(progress) = detail.goal_progress() {
        let _ = writeln!(out, "  {}", progress_bar(progress, 30));
    }
    if let Some(change) = detail.total_change() {
        let _ = writeln!(out, "  Change:      {:+.1} kg", change);
    }
    let _ = writeln!(out);
    out.push_str(&area_chart(&detail.history, 40, 8));
    out
}

/// Full history table plus chart, for the progress screen
pub fn weight_history(detail: &PetDetail) -> String {
    let mut out = format!("{} weight history\n\n", detail.pet.name);
    out.push_str(&area_chart(&detail.history, 50, 10));
    out.push_str("\n\n");
    for record in detail.history.iter().rev() {
        let _ = writeln!(out, "  {}  {:.1} {}", record.date, record.weight, record.unit);
    }
    out
}

fn category_label(category: ReminderCategory) -> &'static str {
    match category {
        ReminderCategory::Vaccine => "Vaccine",
        ReminderCategory::Consultation => "Consultation",
        ReminderCategory::Medication => "Medication",
    }
}

pub fn reminder_row(reminder: &Reminder) -> String {
    format!(
        "[{}] {}  {:<12} {}  ({})",
        if reminder.completed { "x" } else { " " },
        reminder.date.map(|d| d.to_string()).unwrap_or_else(|| "--".to_string()),
        category_label(reminder.category),
        reminder.title,
        reminder.id
    )
}

pub fn reminder_list(reminders: &[&Reminder]) -> String {
    if reminders.is_empty() {
        return "No reminders.".to_string();
    }
    reminders
        .iter()
        .map(|r| reminder_row(r))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn profile_summary(view: &ProfileView<'_>) -> String {
    let mut out = String::new();
    if let Some(account) = &view.account {
        let name = if account.name.is_empty() { "User" } else { account.name.as_str() };
        let _ = writeln!(out, "{}", name);
        let _ = writeln!(out, "{}", account.email);
        if let Some(avatar) = &account.avatar {
            let _ = writeln!(out, "Avatar: {}", avatar);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} cats  {} weight records  {} reminders",
        view.pets.len(),
        view.weight_record_count,
        view.reminder_count
    );
    for pet in &view.pets {
        let _ = writeln!(out, "  - {} ({})", pet.name, pet.id);
    }
    out
}

pub fn remediation_dialog(dialog: &RemediationDialog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", dialog.title);
    let _ = writeln!(out, "{}", dialog.message);
    if !dialog.detail.is_empty() {
        let _ = writeln!(out, "Backend said: {}", dialog.detail);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Run this in the SQL editor of your backend project:");
    let _ = writeln!(out);
    out.push_str(&dialog.sql);
    out
}

pub fn notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => notice.message.clone(),
        NoticeLevel::Transient => format!("(!) {}", notice.message),
        NoticeLevel::Error => format!("Error: {}", notice.message),
    }
}
