use sqlx::Row;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use preorder::admin::{audit, reconcile};
use preorder::store::accounts;

#[derive(Parser, Debug)]
#[command(author, version, about = "pre-order tracker operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Rewrite missing or malformed isAdmin/disabled values to false
    NormalizeAccounts,
    /// List accounts whose credential claims and record disagree
    ClaimDrift,
    /// Print the most recent audit entries
    AuditLog {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Recompute the audit hash chain and report the first broken entry
    VerifyAuditChain,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The binary's CWD may differ from the crate root (e.g. in Docker), so
    // fall back to the crate-local `.env`.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::NormalizeAccounts => {
            let pool = get_pool().await?;
            let changed = accounts::normalize_legacy_flags(&pool).await?;
            println!("Normalized {} flag value(s)", changed);
        }
        Commands::ClaimDrift => {
            let pool = get_pool().await?;
            print_drift(&pool).await?;
        }
        Commands::AuditLog { limit } => {
            let pool = get_pool().await?;
            for entry in audit::list_entries(&pool, limit).await? {
                println!(
                    "{} {:<14} actor={} target={} {:?} -> {} {}",
                    entry.timestamp.to_rfc3339(),
                    entry.action.as_str(),
                    entry.actor_email,
                    entry.target_email.as_deref().unwrap_or(&entry.target_id.to_string()),
                    entry.previous_value,
                    entry.new_value,
                    if entry.success {
                        "ok".to_string()
                    } else {
                        format!("FAILED: {}", entry.error_message.as_deref().unwrap_or("unknown"))
                    }
                );
            }
        }
        Commands::VerifyAuditChain => {
            let pool = get_pool().await?;
            let report = audit::verify_chain(&pool).await?;
            match report.first_broken {
                None => println!("Audit chain intact ({} entries)", report.entries),
                Some(id) => anyhow::bail!("audit chain broken at entry {} ({} entries)", id, report.entries),
            }
        }
    }

    Ok(())
}

async fn print_drift(pool: &SqlitePool) -> anyhow::Result<()> {
    let drift = reconcile::find_claim_drift(pool).await?;
    if drift.is_empty() {
        println!("Claims and records agree");
    }
    for d in &drift {
        println!(
            "{:<36} {:<28} {:<9} claim={:?} record={:?}",
            d.account_id, d.email, d.field, d.claim_value, d.record_value
        );
    }

    let issues = audit::list_sync_issues(pool).await?;
    if !issues.is_empty() {
        println!("\nRecorded sync issues:");
        for issue in issues {
            println!(
                "{} {:<36} {:<9} claim={} record={:?} {}",
                issue.detected_at.to_rfc3339(),
                issue.target_id,
                issue.field,
                issue.claim_value,
                issue.record_value,
                issue.detail
            );
        }
    }

    Ok(())
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let filename = format!("{}_{}.sql", timestamp, sanitized);
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // Without the migrations table nothing has been applied yet
    let table: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // ./migrations when run from the repo root, else the crate-local folder
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
