use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

mod auth;
mod config;
mod db;
mod logging;
mod models;
mod report;
mod trend;
mod widget;

use auth::{ClaimsAuthorizer, RawClaims, SessionState};
use config::Config;
use models::{BestGoal, Widget};
use widget::NewWidget;

#[derive(Parser)]
#[command(name = "library-dashboard")]
#[command(about = "Library dashboard widgets and login checks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample widgets
    Seed,
    /// Create or replace a widget
    CreateWidget {
        #[arg(long)]
        title: String,
        #[arg(long, value_enum)]
        best_goal: BestGoal,
        /// Data points, e.g. '[{"March_2008": 123}, {"April_2008": 456}]'
        #[arg(long)]
        data: String,
        #[arg(long)]
        key_label: String,
        #[arg(long)]
        value_label: String,
        #[arg(long)]
        contact_name: String,
        #[arg(long)]
        contact_email: String,
        #[arg(long, default_value = "")]
        title_info: String,
        #[arg(long, default_value = "")]
        more_info_url: String,
        #[arg(long)]
        max_data_points: Option<i32>,
    },
    /// Replace the data points of a widget
    SetData {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        data: String,
    },
    /// Append data points from a slug,label,value CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print a widget as json
    Show {
        #[arg(long)]
        slug: String,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long)]
        include_inactive: bool,
    },
    /// Evaluate login claims and print the resulting session
    Login {
        /// JSON object of claims; falls back to DSHBRD__TEST_SHIB_JSON
        #[arg(long)]
        claims: Option<PathBuf>,
    },
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url()
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

fn load_claims(path: Option<&PathBuf>, config: &Config) -> anyhow::Result<Option<RawClaims>> {
    let raw = match path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read claims from {}", path.display()))?,
        ),
        None => config.test_claims_json.clone(),
    };

    Ok(raw.as_deref().and_then(parse_claims))
}

/// Anything other than a flat json object of strings counts as no claims.
fn parse_claims(raw: &str) -> Option<RawClaims> {
    match serde_json::from_str::<RawClaims>(raw) {
        Ok(claims) => Some(claims),
        Err(err) => {
            warn!(error = %err, "claims are not a flat json object of strings");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    logging::init(config.log_json);

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            let saved = db::seed(&pool).await?;
            println!("Seeded {saved} widgets.");
        }
        Commands::CreateWidget {
            title,
            best_goal,
            data,
            key_label,
            value_label,
            contact_name,
            contact_email,
            title_info,
            more_info_url,
            max_data_points,
        } => {
            let pool = connect(&config).await?;
            let widget = Widget::new(NewWidget {
                title,
                title_info,
                best_goal,
                data_points: data,
                max_data_points_count: max_data_points,
                key_label,
                value_label,
                data_contact_name: contact_name,
                data_contact_email_address: contact_email,
                more_info_url,
            })?;
            db::save_widget(&pool, &widget).await?;
            info!(slug = %widget.slug, "widget saved");
            if widget.has_invalid_data() {
                println!("Saved {} with invalid data points.", widget.slug);
            } else {
                println!("Saved {}.", widget.slug);
            }
        }
        Commands::SetData { slug, data } => {
            let pool = connect(&config).await?;
            let mut widget = db::fetch_widget(&pool, &slug)
                .await?
                .with_context(|| format!("no widget with slug {slug}"))?;
            let result = widget.set_data_points(data);
            db::save_widget(&pool, &widget).await?;
            match result {
                Ok(_) => println!("Saved {slug}."),
                Err(err) => println!("Saved {slug} with invalid data points: {err}."),
            }
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let appended = db::import_csv(&pool, &csv).await?;
            println!("Appended {appended} data points from {}.", csv.display());
        }
        Commands::Show { slug, url } => {
            let pool = connect(&config).await?;
            let widget = db::fetch_widget(&pool, &slug)
                .await?
                .with_context(|| format!("no widget with slug {slug}"))?;
            println!("{}", widget.to_json(&url, chrono::Utc::now())?);
        }
        Commands::Report {
            out,
            include_inactive,
        } => {
            let pool = connect(&config).await?;
            let widgets = db::fetch_widgets(&pool, include_inactive).await?;
            let report = report::build_report(chrono::Utc::now().date_naive(), &widgets);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Login { claims } => {
            let authorizer = ClaimsAuthorizer::new(config.required_group()?);
            let claims = load_claims(claims.as_ref(), &config)?;
            let verdict = authorizer.authorize(claims.as_ref());
            info!(authorized = verdict.authorized, "login evaluated");
            let session = SessionState::from_verdict(&verdict);
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
    }

    Ok(())
}
