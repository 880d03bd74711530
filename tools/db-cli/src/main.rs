use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use retouch_common::DatabaseConfig;
use retouch_database::{create_pool, MigrationRunner};

#[derive(Parser)]
#[command(name = "db-cli")]
#[command(about = "Retouch marketplace database CLI tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        /// Database URL override
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Check migration status
    Status {
        /// Database URL override
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Seed the admin and support accounts and the default questionnaire
    Seed {
        /// Database URL override
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Reset database (drop, recreate, migrate)
    Reset {
        /// Database URL override
        #[arg(long)]
        database_url: Option<String>,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
        /// Seed after migrating
        #[arg(long)]
        seed: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { database_url } => {
            let runner = connect(database_url).await?;
            runner.run_all_migrations().await?;

            println!("✅ Migrations completed successfully");
        }
        Commands::Status { database_url } => {
            let runner = connect(database_url).await?;
            let status = runner.check_migration_status().await?;
            println!("📊 {}", status);

            if status.is_up_to_date {
                println!("✅ Database is up to date");
            } else {
                println!("⚠️  Database needs migration");
            }
        }
        Commands::Seed { database_url } => {
            let runner = connect(database_url).await?;
            runner.seed_initial_data().await?;

            println!("✅ Initial data seeded successfully");
        }
        Commands::Reset { database_url, force, seed } => {
            if !force && !confirm_reset()? {
                println!("❌ Operation cancelled");
                return Ok(());
            }

            let config = database_config(database_url)?;
            recreate_database(&config).await?;

            let pool = create_pool(&config).await?;
            let runner = MigrationRunner::new(pool);
            runner.run_all_migrations().await?;
            if seed {
                runner.seed_initial_data().await?;
            }

            println!("✅ Database reset completed");
        }
    }

    Ok(())
}

fn database_config(database_url: Option<String>) -> anyhow::Result<DatabaseConfig> {
    let config = match database_url {
        Some(url) => DatabaseConfig::from_url(&url)?,
        None => DatabaseConfig::from_env()?,
    };
    Ok(config)
}

async fn connect(database_url: Option<String>) -> anyhow::Result<MigrationRunner> {
    let config = database_config(database_url)?;
    let pool = create_pool(&config)
        .await
        .with_context(|| format!("connecting to {}:{}/{}", config.host, config.port, config.database))?;
    Ok(MigrationRunner::new(pool))
}

fn confirm_reset() -> anyhow::Result<bool> {
    println!("⚠️  This will delete ALL data in the database!");
    println!("Type 'yes' to continue:");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == "yes")
}

/// Database names are interpolated into DDL, so only plain identifiers are accepted.
fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

async fn recreate_database(config: &DatabaseConfig) -> anyhow::Result<()> {
    if !is_plain_identifier(&config.database) {
        bail!("refusing to reset database with unusual name {:?}", config.database);
    }

    let admin_config = DatabaseConfig {
        database: "postgres".to_string(),
        max_connections: 1,
        ..config.clone()
    };
    let admin_pool = create_pool(&admin_config).await?;

    // Terminate existing connections
    sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(&config.database)
    .execute(&admin_pool)
    .await?;

    sqlx::query(&format!("DROP DATABASE IF EXISTS {}", config.database))
        .execute(&admin_pool)
        .await?;
    sqlx::query(&format!("CREATE DATABASE {}", config.database))
        .execute(&admin_pool)
        .await?;

    tracing::info!("Recreated database {}", config.database);
    Ok(())
}
