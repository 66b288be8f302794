mod config;
mod plan_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};

use muscleden_core::backend::GeminiBackend;
use muscleden_core::session;
use muscleden_core::store::PgPlanStore;
use muscleden_db::config::DbConfig;
use muscleden_db::pool;

use config::MuscledenConfig;
use plan_cmds::GenerateArgs;

#[derive(Parser)]
#[command(name = "muscleden", about = "AI-generated personal fitness plans")]
struct Cli {
    /// Database URL (overrides MUSCLEDEN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a muscleden config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Gemini API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the muscleden database
    DbInit,
    /// Issue a session token for the HTTP API
    Login,
    /// Generate a fitness plan and save it
    Generate {
        /// Your name
        #[arg(long)]
        name: String,
        /// Age in years
        #[arg(long)]
        age: String,
        /// Weight in kilograms
        #[arg(long)]
        weight: String,
        /// Height in centimetres
        #[arg(long)]
        height: String,
        /// What you want to achieve
        #[arg(long)]
        goals: String,
        /// Preferred kinds of exercise
        #[arg(long)]
        preference: Option<String>,
    },
    /// List the most recent plans
    History,
    /// Show one saved plan
    Show {
        /// Plan ID to show
        plan_id: String,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

/// Execute the `muscleden init` command: write config file.
fn cmd_init(db_url: &str, api_key: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let session_secret = config::generate_session_secret();
    let has_api_key = api_key.is_some();

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        auth: config::AuthSection {
            session_secret: session_secret.clone(),
        },
        generation: config::GenerationSection {
            api_key,
            ..Default::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!(
        "  auth.session_secret = {}...{}",
        &session_secret[..8],
        &session_secret[56..]
    );
    if has_api_key {
        println!("  generation.api_key = (set)");
    } else {
        println!("  generation.api_key = (not set; GEMINI_API_KEY will be used)");
    }
    println!();
    println!("Next: run `muscleden db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `muscleden db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = MuscledenConfig::resolve(cli_db_url)?;

    println!("Initializing muscleden database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let status = pool::schema_status(&db_pool).await?;
    match status.migration_version {
        Some(version) => println!("Database ready at migration {version}."),
        None => println!("Database ready."),
    }
    println!("  fitness_plans: {} rows", status.plan_count);

    db_pool.close().await;

    println!("muscleden db-init complete.");
    Ok(())
}

/// Execute the `muscleden login` command: print a fresh session token.
fn cmd_login(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = MuscledenConfig::resolve(cli_db_url)?;
    let sessions = resolved.session_config()?;
    let (session, token) = session::issue_token(sessions);

    tracing::info!(session = %session.id, "issued session token");
    println!("{token}");
    eprintln!(
        "Session {} valid for {} days. Send it as `Authorization: Bearer <token>`.",
        session.id,
        sessions.max_age.num_days()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            force,
        } => {
            cmd_init(&db_url, api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Login => {
            cmd_login(cli.database_url.as_deref())?;
        }
        Commands::Generate {
            name,
            age,
            weight,
            height,
            goals,
            preference,
        } => {
            let resolved = MuscledenConfig::resolve(cli.database_url.as_deref())?;
            let backend = GeminiBackend::new(resolved.gemini_config()?)?;
            // Connect on first use so an unreachable database still lets the
            // plan be generated and printed.
            let db_pool = pool::create_lazy_pool(&resolved.db_config)?;
            let store = PgPlanStore::new(db_pool.clone());
            let args = GenerateArgs {
                name,
                age,
                weight,
                height,
                goals,
                preference,
            };
            let result = plan_cmds::run_generate(&backend, &store, args).await;
            db_pool.close().await;
            result?;
        }
        Commands::History => {
            let resolved = MuscledenConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_history(&PgPlanStore::new(db_pool.clone())).await;
            db_pool.close().await;
            result?;
        }
        Commands::Show { plan_id } => {
            let resolved = MuscledenConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_show(&PgPlanStore::new(db_pool.clone()), &plan_id).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = MuscledenConfig::resolve(cli.database_url.as_deref())?;
            let sessions = resolved.session_config()?.clone();
            let backend = GeminiBackend::new(resolved.gemini_config()?)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let state = serve_cmd::AppState {
                store: Arc::new(PgPlanStore::new(db_pool.clone())),
                backend: Arc::new(backend),
                sessions: Arc::new(sessions),
            };
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "muscleden",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_requires_all_measurements() {
        let err = Cli::try_parse_from(["muscleden", "generate", "--name", "Jane"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["muscleden", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind, port } => {
                assert_eq!(bind, "127.0.0.1");
                assert_eq!(port, 3000);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn global_database_url_flag() {
        let cli =
            Cli::try_parse_from(["muscleden", "history", "--database-url", "postgresql://x/y"])
                .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://x/y"));
    }
}
