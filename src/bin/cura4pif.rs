use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use cura4pif::config::AppConfig;
use cura4pif::forms::{
    AuthController, AuthMode, AuthOutcome, EditPetController, NewReminderController,
    ProfileEditController, SaveOutcome, WeightEntryController,
};
use cura4pif::gateway::Gateway;
use cura4pif::heartbeat;
use cura4pif::models::{ActivityLevel, Gender, ReminderCategory, WeightUnit};
use cura4pif::render;
use cura4pif::views::{DetailState, PetDetailView, PetListView, ProfileView, ReminderListView};

#[derive(Parser, Debug)]
#[clap(name = "cura4pif", version)]
#[clap(about = "Track your cats' weight, health reminders and progress", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Where the session and last used email are kept
    #[clap(long, env = "CURA4PIF_SESSION_FILE", default_value = ".cura4pif-session.json")]
    session_file: PathBuf,

    /// Output debug logs to stderr
    #[clap(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in with email and password
    Login(Credentials),
    /// Create an account
    Register(Credentials),
    /// Sign out and forget the stored session
    Logout,
    /// Cats
    #[clap(subcommand)]
    Pets(PetCommands),
    /// Weight records
    #[clap(subcommand)]
    Weight(WeightCommands),
    /// Health reminders
    #[clap(subcommand)]
    Reminders(ReminderCommands),
    /// Account profile
    #[clap(subcommand)]
    Profile(ProfileCommands),
}

#[derive(Args, Debug)]
struct Credentials {
    /// Defaults to the last used email
    #[clap(long)]
    email: Option<String>,
    #[clap(long, env = "CURA4PIF_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand, Debug)]
enum PetCommands {
    /// List cats with their weight trend
    List,
    /// Show one cat
    Show { id: String },
    /// Weight history chart
    Progress { id: String },
    /// Add a cat
    Add(PetFields),
    /// Edit a cat
    Edit {
        id: String,
        #[clap(flatten)]
        fields: PetFields,
    },
    /// Delete a cat
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[clap(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
struct PetFields {
    #[clap(long)]
    name: Option<String>,
    #[clap(long)]
    breed: Option<String>,
    /// male / female
    #[clap(long)]
    gender: Option<Gender>,
    /// YYYY-MM-DD
    #[clap(long)]
    birth_date: Option<String>,
    #[clap(long)]
    neutered: Option<bool>,
    /// Current weight; comma or dot decimals
    #[clap(long)]
    weight: Option<String>,
    #[clap(long)]
    goal_weight: Option<String>,
    /// low / medium / high
    #[clap(long)]
    activity: Option<ActivityLevel>,
    /// Photo to upload
    #[clap(long)]
    photo: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum WeightCommands {
    /// Record a weight
    Add {
        pet_id: String,
        weight: String,
        /// YYYY-MM-DD, defaults to today
        #[clap(long)]
        date: Option<String>,
        #[clap(long, default_value = "kg")]
        unit: WeightUnit,
    },
}

#[derive(Subcommand, Debug)]
enum ReminderCommands {
    /// List reminders
    List,
    /// Add a reminder
    Add {
        #[clap(long)]
        title: String,
        /// YYYY-MM-DD
        #[clap(long)]
        date: String,
        /// vaccine / consultation / medication
        #[clap(long = "type", default_value = "vaccine")]
        category: ReminderCategory,
    },
    /// Mark a reminder done or not done
    Toggle { id: String },
}

#[derive(Subcommand, Debug)]
enum ProfileCommands {
    /// Show the profile and counts
    Show,
    /// Change the display name
    Edit {
        #[clap(long)]
        name: String,
    },
}

fn prompt_yes_no(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim"))
}

async fn attach_photo(controller: &mut EditPetController<'_>, photo: &Path) -> anyhow::Result<()> {
    let contents = tokio::fs::read(photo)
        .await
        .with_context(|| format!("Failed to read photo {}", photo.display()))?;
    let file_name = photo
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "photo.jpg".to_string());
    controller.select_image(&file_name, contents, None);
    Ok(())
}

fn apply_fields(controller: &mut EditPetController<'_>, fields: &PetFields) {
    let form = &mut controller.form;
    if let Some(name) = &fields.name {
        form.name = name.clone();
    }
    if let Some(breed) = &fields.breed {
        form.breed = breed.clone();
    }
    if let Some(gender) = fields.gender {
        form.gender = gender;
    }
    if let Some(birth_date) = &fields.birth_date {
        form.birth_date = birth_date.clone();
    }
    if let Some(neutered) = fields.neutered {
        form.neutered = neutered;
    }
    if let Some(weight) = &fields.weight {
        form.weight = weight.clone();
    }
    if let Some(goal) = &fields.goal_weight {
        form.goal_weight = goal.clone();
    }
    if let Some(activity) = fields.activity {
        form.activity_level = activity;
    }
}

async fn save_pet(mut controller: EditPetController<'_>) -> anyhow::Result<()> {
    let mut ignore_image_errors = false;
    loop {
        match controller.save(ignore_image_errors).await {
            SaveOutcome::Saved(id) => {
                println!("Saved {}", id.unwrap_or_else(|| controller.form.name.clone()));
                return Ok(());
            }
            SaveOutcome::Remediation(dialog) => {
                eprintln!("{}", render::remediation_dialog(&dialog));
                if dialog.allows_skip_image()
                    && !ignore_image_errors
                    && prompt_yes_no("Save without the photo?")?
                {
                    ignore_image_errors = true;
                    continue;
                }
                bail!("{}", dialog.message);
            }
            SaveOutcome::Invalid(message) => bail!(message),
            SaveOutcome::NotAuthenticated => bail!("Not signed in. Run `cura4pif login` first."),
            SaveOutcome::Failed(message) => bail!("Error saving: {}", message),
        }
    }
}

async fn authenticate(
    gateway: &Gateway,
    mode: AuthMode,
    credentials: Credentials,
) -> anyhow::Result<()> {
    let mut controller = AuthController::new(gateway);
    controller.mode = mode;
    if let Some(email) = credentials.email {
        controller.email = email;
    }
    if controller.email.is_empty() {
        bail!("--email is required the first time");
    }
    controller.password = credentials.password;

    match controller.submit().await {
        AuthOutcome::SignedIn(session) => {
            println!("Signed in as {}", session.user.email.as_deref().unwrap_or(&controller.email));
            Ok(())
        }
        AuthOutcome::ConfirmationRequired { email } => {
            println!(
                "Account created for {}. Confirm the email, or turn off \"Confirm Email\" in the backend auth settings, then log in.",
                email
            );
            Ok(())
        }
        AuthOutcome::Failed(message) => Err(anyhow!(message)),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("Missing backend configuration")?;
    if config.session_file.is_none() {
        config = config.with_session_file(cli.session_file.clone());
    }
    let gateway = Gateway::new(config)?;

    gateway.restore_session().await?;
    heartbeat::keep_alive(&gateway).await;

    match cli.command {
        Commands::Login(credentials) => authenticate(&gateway, AuthMode::SignIn, credentials).await?,
        Commands::Register(credentials) => {
            authenticate(&gateway, AuthMode::Register, credentials).await?
        }
        Commands::Logout => {
            if gateway.session().is_some() {
                if let Err(e) = gateway.sign_out().await {
                    tracing::warn!(error = %e, "sign-out request failed");
                }
            }
            println!("Signed out.");
        }
        Commands::Pets(command) => match command {
            PetCommands::List => {
                let mut view = PetListView::new(&gateway);
                view.refresh().await?;
                println!("{}", render::pet_list(view.greeting_name.as_deref(), &view.pets));
            }
            PetCommands::Show { id } => {
                let mut view = PetDetailView::new(&gateway, &id);
                match view.load().await? {
                    DetailState::Found(detail) => println!("{}", render::pet_detail(detail)),
                    _ => bail!("Cat not found"),
                }
            }
            PetCommands::Progress { id } => {
                let mut view = PetDetailView::new(&gateway, &id);
                match view.load().await? {
                    DetailState::Found(detail) => println!("{}", render::weight_history(detail)),
                    _ => bail!("Cat not found"),
                }
            }
            PetCommands::Add(fields) => {
                let mut controller = EditPetController::new_pet(&gateway);
                apply_fields(&mut controller, &fields);
                if let Some(photo) = &fields.photo {
                    attach_photo(&mut controller, photo).await?;
                }
                save_pet(controller).await?;
            }
            PetCommands::Edit { id, fields } => {
                let mut controller = EditPetController::edit(&gateway, &id).await?;
                apply_fields(&mut controller, &fields);
                if let Some(photo) = &fields.photo {
                    attach_photo(&mut controller, photo).await?;
                }
                save_pet(controller).await?;
            }
            PetCommands::Delete { id, yes } => {
                let controller = EditPetController::edit(&gateway, &id).await?;
                let confirm = |prompt: &str| yes || prompt_yes_no(prompt).unwrap_or(false);
                if controller.delete(&confirm).await? {
                    println!("Deleted.");
                } else {
                    println!("Kept.");
                }
            }
        },
        Commands::Weight(WeightCommands::Add {
            pet_id,
            weight,
            date,
            unit,
        }) => {
            let mut controller = WeightEntryController::new(&gateway, &pet_id);
            controller.weight = weight;
            controller.unit = unit;
            if let Some(date) = date {
                controller.date = date;
            }
            let record = controller.save().await?;
            println!("Recorded {:.1} {} on {}", record.weight, record.unit, record.date);
        }
        Commands::Reminders(command) => match command {
            ReminderCommands::List => {
                let mut view = ReminderListView::new(&gateway);
                view.refresh().await?;
                println!("{}", render::reminder_list(&view.pending_first()));
            }
            ReminderCommands::Add {
                title,
                date,
                category,
            } => {
                let mut controller = NewReminderController::new(&gateway);
                controller.title = title;
                controller.date = date;
                controller.category = category;
                let reminder = controller.save().await?;
                println!("{}", render::reminder_row(&reminder));
            }
            ReminderCommands::Toggle { id } => {
                let mut view = ReminderListView::new(&gateway);
                view.refresh().await?;
                if let Some(notice) = view.toggle(&id).await? {
                    eprintln!("{}", render::notice(&notice));
                }
                if let Some(reminder) = view.get(&id) {
                    println!("{}", render::reminder_row(reminder));
                }
            }
        },
        Commands::Profile(command) => match command {
            ProfileCommands::Show => {
                let mut view = ProfileView::new(&gateway);
                view.refresh().await?;
                println!("{}", render::profile_summary(&view));
            }
            ProfileCommands::Edit { name } => {
                let mut controller = ProfileEditController::load(&gateway).await?;
                controller.name = name;
                controller.save().await?;
                println!("Profile updated.");
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
