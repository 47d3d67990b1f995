use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

mod config;
mod db;
mod error;
mod models;
mod report;
mod seed;
mod stats;
mod transfer;

use config::StatsConfig;
use models::{ScoreRecord, StatsFilter, StudentPayload, Subject};

#[derive(Parser)]
#[command(name = "score-atlas")]
#[command(about = "Exam score roster and statistics engine", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    /// Statistics configuration (defaults to a discovered score-atlas.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Only students whose name contains this text
    #[arg(long)]
    keyword: Option<String>,
    #[arg(long)]
    min_total: Option<f64>,
    #[arg(long)]
    max_total: Option<f64>,
}

impl FilterArgs {
    fn to_filter(&self) -> StatsFilter {
        StatsFilter::new(self.keyword.as_deref(), self.min_total, self.max_total)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb {
        /// Generate the default roster when the table is empty
        #[arg(long)]
        seed_if_empty: bool,
    },
    /// Replace the roster with generated sample students
    Seed {
        #[arg(long, default_value_t = seed::DEFAULT_COUNT)]
        count: usize,
        #[arg(long)]
        keep_existing: bool,
    },
    /// Add one student
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        chinese: f64,
        #[arg(long)]
        math: f64,
        #[arg(long)]
        english: f64,
        #[arg(long)]
        physics: f64,
        #[arg(long)]
        chemistry: f64,
        #[arg(long)]
        biology: f64,
    },
    /// Change a single subject score (code or label, e.g. `math` or `数学`)
    Patch {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        subject: Subject,
        #[arg(long)]
        score: f64,
    },
    /// Remove a student
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// List students in rank order
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Import students from CSV or a JSON document
    #[command(group(
        ArgGroup::new("source")
            .args(["csv", "json"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: Option<PathBuf>,
        /// Replace the roster on CSV import (JSON documents carry their own `replace`)
        #[arg(long)]
        replace: bool,
    },
    /// Export the full roster
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        #[arg(long)]
        out: PathBuf,
    },
    /// Compute statistics as JSON
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
        /// Read a JSON roster export instead of the database
        #[arg(long)]
        from: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        from: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "score_atlas=debug"
    } else {
        "score_atlas=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(directive)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => StatsConfig::load(path)?,
        None => StatsConfig::discover()?.unwrap_or_default(),
    };
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::InitDb { seed_if_empty } => {
            let pool = connect(database_url).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
            if seed_if_empty && db::ensure_seeded(&pool).await? {
                println!("Seeded {} sample students.", seed::DEFAULT_COUNT);
            }
        }
        Commands::Seed {
            count,
            keep_existing,
        } => {
            let pool = connect(database_url).await?;
            let inserted = db::seed(&pool, count, !keep_existing).await?;
            println!("Generated {inserted} students.");
        }
        Commands::Add {
            name,
            chinese,
            math,
            english,
            physics,
            chemistry,
            biology,
        } => {
            let student = StudentPayload {
                name,
                chinese: Some(chinese),
                math: Some(math),
                english: Some(english),
                physics: Some(physics),
                chemistry: Some(chemistry),
                biology: Some(biology),
            }
            .validate()?;
            let pool = connect(database_url).await?;
            let record = db::add_student(&pool, &student).await?;
            println!("Added {} ({}) with total {}.", record.name, record.id, record.total());
        }
        Commands::Patch { id, subject, score } => {
            let pool = connect(database_url).await?;
            let record = db::patch_subject(&pool, id, subject, score).await?;
            println!(
                "{} {} is now {}; total {}.",
                record.name,
                subject.label(),
                record.score(subject),
                record.total()
            );
        }
        Commands::Delete { id } => {
            let pool = connect(database_url).await?;
            db::delete_student(&pool, id).await?;
            println!("Deleted {id}.");
        }
        Commands::List { filter, limit } => {
            let pool = connect(database_url).await?;
            let records = db::fetch_students(&pool, &filter.to_filter(), limit).await?;
            if records.is_empty() {
                println!("No students match this filter.");
                return Ok(());
            }
            for (rank, record) in records.iter().enumerate() {
                println!("{}", format_row(rank + 1, record));
            }
        }
        Commands::Import { csv, json, replace } => {
            let (students, replace) = match (csv, json) {
                (Some(path), _) => {
                    let file = std::fs::File::open(&path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    (transfer::read_csv(file)?, replace)
                }
                (None, json) => {
                    let path = json.context("either --csv or --json is required")?;
                    transfer::read_json(&read_text(&path)?)?
                }
            };
            let pool = connect(database_url).await?;
            let inserted = db::import_students(&pool, &students, replace).await?;
            println!("Imported {inserted} students.");
        }
        Commands::Export { format, out } => {
            let pool = connect(database_url).await?;
            let records = db::fetch_students(&pool, &StatsFilter::default(), None).await?;
            match format {
                ExportFormat::Csv => {
                    let file = std::fs::File::create(&out)
                        .with_context(|| format!("failed to create {}", out.display()))?;
                    transfer::write_csv(file, &records)?;
                }
                ExportFormat::Json => {
                    let body = serde_json::to_string_pretty(&transfer::export_json(&records))?;
                    std::fs::write(&out, body)?;
                }
            }
            println!("Exported {} students to {}.", records.len(), out.display());
        }
        Commands::Stats {
            filter,
            from,
            out,
            pretty,
        } => {
            let filter = filter.to_filter();
            let records = load_records(database_url, from.as_deref(), &filter).await?;
            let result = stats::build_stats(&records, &config);
            let body = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, body)?;
                    println!(
                        "Statistics for {} students written to {}.",
                        result.count,
                        path.display()
                    );
                }
                None => println!("{body}"),
            }
        }
        Commands::Report { filter, from, out } => {
            let filter = filter.to_filter();
            let records = load_records(database_url, from.as_deref(), &filter).await?;
            let result = stats::build_stats(&records, &config);
            let report = report::build_report(&filter, &result, chrono::Utc::now());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url =
        database_url.context("DATABASE_URL must be set to a Postgres instance")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Takes the snapshot the statistics are computed on, either from the
/// database or from a JSON export filtered in memory.
async fn load_records(
    database_url: Option<&str>,
    from: Option<&Path>,
    filter: &StatsFilter,
) -> anyhow::Result<Vec<ScoreRecord>> {
    match from {
        Some(path) => {
            let mut records = transfer::read_snapshot(&read_text(path)?)?;
            records.retain(|record| filter.matches(record));
            records.sort_by(stats::rank_order);
            Ok(records)
        }
        None => {
            let pool = connect(database_url).await?;
            db::fetch_students(&pool, filter, None).await
        }
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn format_row(rank: usize, record: &ScoreRecord) -> String {
    let subjects = Subject::ALL
        .iter()
        .map(|&subject| format!("{} {}", subject.label(), record.score(subject)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{rank}. {} ({}) total {} [{subjects}]",
        record.name,
        record.id,
        record.total()
    )
}
