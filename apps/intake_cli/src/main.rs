use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use intake_core::{
    constraints::format_inr, load_settings, load_settings_from, ClientSettings,
    ConfidenceFieldReconciler, DocumentUpload, DurableProfileIdStore, FieldConstraintSet,
    FinancialProfileDraft, HttpIntakeBackend, IntakeController, IntakePath, PresentationState,
    PresentationView, ProfileIdStore, ProgressSequencer, ProgressStatus, SubmissionCoordinator,
    SubmissionError,
};
use shared::domain::{AgeBracket, CityType, ProfileField};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Collect a salary profile and compare tax regimes")]
struct Cli {
    /// Overrides the API base URL from config and environment.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enter the profile from a JSON draft and walk it through the wizard.
    Manual {
        #[arg(long)]
        draft: PathBuf,
    },
    /// Upload a Form 16 or payslip and confirm the extracted values.
    Upload {
        #[arg(long)]
        file: PathBuf,
        /// Override a reviewable value, e.g. `--set hra_received=60000`.
        #[arg(long = "set", value_parser = parse_override)]
        overrides: Vec<(ProfileField, f64)>,
        #[arg(long)]
        rent: Option<f64>,
        #[arg(long)]
        city: Option<CityType>,
        #[arg(long)]
        age: Option<AgeBracket>,
        #[arg(long)]
        parents_senior: bool,
    },
    /// Print the most recently confirmed profile id.
    LastProfile,
}

fn parse_override(raw: &str) -> Result<(ProfileField, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let field = name.parse::<ProfileField>().map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|e| format!("invalid amount for {field}: {e}"))?;
    Ok((field, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    let store = DurableProfileIdStore::open(&settings.database_url).await?;

    match cli.command {
        Command::Manual { draft } => run_manual(&settings, &store, draft).await,
        Command::Upload {
            file,
            overrides,
            rent,
            city,
            age,
            parents_senior,
        } => {
            let review = ReviewInput {
                overrides,
                rent,
                city,
                age,
                parents_senior,
            };
            run_upload(&settings, &store, file, review).await
        }
        Command::LastProfile => {
            match store.last_profile_id().await? {
                Some(profile_id) => println!("{profile_id}"),
                None => println!("no profile has been confirmed yet"),
            }
            Ok(())
        }
    }
}

fn build_controller(settings: &ClientSettings, path: IntakePath) -> Result<IntakeController> {
    let backend = HttpIntakeBackend::from_settings(settings)?;
    info!(api = %backend.base_url(), %path, "intake: starting");
    Ok(IntakeController::new(
        Arc::new(SubmissionCoordinator::new(Arc::new(backend), path)),
        ProgressSequencer::new(settings.progress_phases()),
        Arc::new(FieldConstraintSet::standard()),
    ))
}

fn spawn_progress_printer(controller: &IntakeController) {
    let mut rx = controller.progress().subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            if let ProgressStatus::Playing { label, .. } = status {
                println!("  ... {label}");
            }
        }
    });
}

async fn run_manual(
    settings: &ClientSettings,
    store: &DurableProfileIdStore,
    draft_path: PathBuf,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(&draft_path)
        .await
        .with_context(|| format!("failed to read draft '{}'", draft_path.display()))?;
    let draft: FinancialProfileDraft = serde_json::from_str(&raw)
        .with_context(|| format!("invalid draft '{}'", draft_path.display()))?;

    let controller = build_controller(settings, IntakePath::Manual)?;
    let mut wizard = controller.new_wizard_with(draft);
    while !wizard.step().is_terminal() {
        let step = wizard.step();
        if let Err(errors) = wizard.advance() {
            eprintln!("{step} needs attention:");
            for (field, message) in errors.iter() {
                eprintln!("  {}: {message}", field.label());
            }
            bail!("draft is incomplete");
        }
    }

    println!("Review");
    for line in wizard.review_summary() {
        println!("  [{}] {:<34} {}", line.step, line.label, line.value);
    }

    spawn_progress_printer(&controller);
    match wizard.submit(&controller).await {
        Ok(completed) => present(PresentationView::enter(completed.handoff, store).await),
        Err(err) => {
            report_failure(&err);
            for (field, message) in wizard.errors().iter() {
                eprintln!("  {}: {message}", field.label());
            }
            Err(anyhow!(err))
        }
    }
}

#[derive(Debug)]
struct ReviewInput {
    overrides: Vec<(ProfileField, f64)>,
    rent: Option<f64>,
    city: Option<CityType>,
    age: Option<AgeBracket>,
    parents_senior: bool,
}

async fn run_upload(
    settings: &ClientSettings,
    store: &DurableProfileIdStore,
    file: PathBuf,
    review: ReviewInput,
) -> Result<()> {
    let document = DocumentUpload::from_path(&file).await?;
    let controller = build_controller(settings, IntakePath::Upload)?;

    let mut reconciler = match controller.upload(&document).await {
        Ok(reconciler) => reconciler,
        Err(SubmissionError::Reconcile(err)) => {
            println!("{err}. Please enter your details manually with the `manual` command.");
            return Ok(());
        }
        Err(err) => {
            report_failure(&err);
            return Err(anyhow!(err));
        }
    };
    print_review(&reconciler);

    for (field, value) in review.overrides {
        reconciler.set_override(field, Some(value))?;
    }
    let supplementary = reconciler.supplementary_mut();
    supplementary.monthly_rent_paid = review.rent;
    supplementary.city_type = review.city;
    supplementary.age_bracket = review.age;
    supplementary.parent_senior_citizen = review.parents_senior;

    spawn_progress_printer(&controller);
    match controller.confirm(&mut reconciler).await {
        Ok(completed) => {
            for warning in &completed.receipt.warnings {
                println!("note: {warning}");
            }
            present(PresentationView::enter(completed.handoff, store).await)
        }
        Err(err) => {
            report_failure(&err);
            for (field, message) in reconciler.errors().iter() {
                eprintln!("  {}: {message}", field.label());
            }
            Err(anyhow!(err))
        }
    }
}

fn print_review(reconciler: &ConfidenceFieldReconciler) {
    let summary = reconciler.summary();
    println!(
        "Extracted {} values ({} green, {} yellow, {} red)",
        summary.field_count, summary.green_count, summary.yellow_count, summary.red_count
    );
    for warning in reconciler.warnings() {
        println!("warning: {}", warning.message);
    }
    for row in reconciler.review_grid() {
        let value = row.effective.map(format_inr).unwrap_or_else(|| "-".into());
        let lock = if row.editable { "" } else { " (locked)" };
        println!(
            "  {:<34} {:<14} {}{lock}",
            row.field.label(),
            value,
            row.confidence
        );
    }
    for (field, value) in reconciler.missing_fields() {
        let value = value.map(format_inr).unwrap_or_else(|| "-".into());
        println!("  {:<34} {:<14} not found, use --set", field.label(), value);
    }
}

fn report_failure(err: &SubmissionError) {
    match err.failure() {
        Some(failure) => {
            eprintln!("{} failed: {}", failure.stage, failure.message);
            for message in failure.general_messages() {
                eprintln!("  {message}");
            }
            if failure.requires_new_upload() {
                eprintln!("the review session expired; upload the document again");
            }
        }
        None => eprintln!("{err}"),
    }
}

fn present(view: PresentationView) -> Result<()> {
    match view.into_state() {
        PresentationState::Results(packet) => {
            println!("Profile {}", packet.profile_id);
            if let Some(regime) = packet.result.recommended_regime() {
                println!("Recommended regime: {regime}");
            }
            if let Some(savings) = packet.result.savings_amount() {
                println!("Estimated savings: {}", format_inr(savings));
            }
            if let Some(rationale) = packet.result.rationale() {
                println!("{rationale}");
            }
            Ok(())
        }
        PresentationState::SessionExpired => {
            println!("Your session expired. Start the intake again.");
            Ok(())
        }
    }
}
