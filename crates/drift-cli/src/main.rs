use drift::{
    ConventionGuess, CurrentSchema, Differ, Driver, MySqlCatalog, Offline, PgCatalog,
    StatementBatch, TableModel, artifact, reverse_script,
};
use facet::Facet;
use figue as args;
use jiff::Zoned;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

mod config;
mod input;

/// Schema drift detection and migration generation for MySQL and Postgres.
#[derive(Facet, Debug)]
struct Cli {
    /// Show version information
    #[facet(args::named, args::short = 'V')]
    version: bool,

    /// Command to run
    #[facet(default, args::subcommand)]
    command: Option<Commands>,
}

/// Available commands
#[derive(Facet, Debug)]
#[repr(u8)]
enum Commands {
    /// Print the up and down scripts
    Diff {
        /// Table model file (JSON)
        #[facet(default, args::named)]
        models: Option<String>,
        /// Schema snapshot file (JSON)
        #[facet(default, args::named)]
        snapshot: Option<String>,
        /// Database URL, read the live catalog instead of a snapshot
        #[facet(default, args::named)]
        database_url: Option<String>,
        /// Database driver (mysql, mariadb, postgres)
        #[facet(default, args::named)]
        driver: Option<String>,
        /// Guess fk_<table>_<column> when no catalog is available
        #[facet(default, args::named)]
        offline_guess: bool,
    },
    /// Write a migration file
    Generate {
        /// Migration name (e.g., "add-posts")
        #[facet(args::positional)]
        name: String,
        /// Table model file (JSON)
        #[facet(default, args::named)]
        models: Option<String>,
        /// Schema snapshot file (JSON)
        #[facet(default, args::named)]
        snapshot: Option<String>,
        /// Database URL, read the live catalog instead of a snapshot
        #[facet(default, args::named)]
        database_url: Option<String>,
        /// Database driver (mysql, mariadb, postgres)
        #[facet(default, args::named)]
        driver: Option<String>,
        /// Guess fk_<table>_<column> when no catalog is available
        #[facet(default, args::named)]
        offline_guess: bool,
    },
}

/// Where models and live state come from, after merging flags and config.
struct Sources {
    models: Option<String>,
    snapshot: Option<String>,
    database_url: Option<String>,
    driver: Option<String>,
    offline_guess: bool,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args_ref: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let result: Result<Cli, _> = args::from_slice(&args_ref);

    match result {
        Ok(cli) => {
            init_tracing();
            if let Err(e) = run(cli).await {
                eprintln!("{} {}", "error:".red().bold(), e);
                std::process::exit(1);
            }
        }
        Err(err) if err.is_help_request() => {
            print!("{}", err.help_text().unwrap_or(""));
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("drift=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if cli.version {
        println!("drift {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    match cli.command {
        Some(Commands::Diff {
            models,
            snapshot,
            database_url,
            driver,
            offline_guess,
        }) => {
            let sources = Sources {
                models,
                snapshot,
                database_url,
                driver,
                offline_guess,
            };
            let config = config::load_or_default()?;
            let (batch, differ) = compute(&config, sources).await?;
            let up = batch.to_sql();
            let down = reverse_script(&up, differ.dialect());

            if batch.is_empty() {
                println!("{}", "Schema is up to date.".green());
                return Ok(());
            }
            println!("{}", "-- up".cyan().bold());
            println!("{}", up);
            println!();
            println!("{}", "-- down".cyan().bold());
            println!("{}", down);
            Ok(())
        }
        Some(Commands::Generate {
            name,
            models,
            snapshot,
            database_url,
            driver,
            offline_guess,
        }) => {
            let sources = Sources {
                models,
                snapshot,
                database_url,
                driver,
                offline_guess,
            };
            let config = config::load_or_default()?;
            let (batch, differ) = compute(&config, sources).await?;
            if batch.is_empty() {
                println!("{}", "Schema is up to date, nothing to generate.".green());
                return Ok(());
            }
            let up = batch.to_sql();
            let down = reverse_script(&up, differ.dialect());

            let now = Zoned::now();
            let dir = PathBuf::from(config.migrations_dir());
            let path = dir.join(artifact::migration_file_name(&now, &name));
            let contents = artifact::render_migration(&name, &now, &up, &down);
            write_migration(&dir, &path, &contents)?;

            println!("{} {}", "Created".green().bold(), path.display());
            let manual = down.lines().filter(|l| l.starts_with("-- MANUAL:")).count();
            if manual > 0 {
                println!(
                    "{}",
                    format!("{} statement(s) in the down script need a manual inverse", manual)
                        .yellow()
                );
            }
            Ok(())
        }
        None => {
            let config = args::HelpConfig {
                program_name: Some("drift".to_string()),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
                ..Default::default()
            };
            print!("{}", args::generate_help::<Cli>(&config));
            Ok(())
        }
    }
}

/// Load everything and run the diff.
async fn compute(
    config: &config::Config,
    sources: Sources,
) -> Result<(StatementBatch, Differ), CliError> {
    let database_url = sources
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .filter(|_| sources.snapshot.is_none());

    let driver = sources
        .driver
        .or_else(|| config.driver.clone())
        .unwrap_or_else(|| driver_for_url(database_url.as_deref()).to_string());
    let differ = Differ::new(config::engine_config(config, driver))?;

    let models_path = sources
        .models
        .or_else(|| config.models.clone())
        .ok_or(CliError::MissingModels)?;
    let tables = input::load_models(Path::new(&models_path))?;
    tracing::info!(path = %models_path, tables = tables.len(), "loaded models");

    let batch = match (sources.snapshot, database_url) {
        (Some(path), _) => {
            let current = input::load_snapshot(Path::new(&path))?;
            diff_offline(&differ, &tables, &current, sources.offline_guess).await?
        }
        (None, Some(url)) => diff_live(&differ, &tables, &url).await?,
        (None, None) => {
            tracing::warn!("no snapshot or database URL given; diffing against an empty database");
            diff_offline(&differ, &tables, &CurrentSchema::new(), sources.offline_guess).await?
        }
    };
    Ok((batch, differ))
}

async fn diff_offline(
    differ: &Differ,
    tables: &[TableModel],
    current: &CurrentSchema,
    offline_guess: bool,
) -> Result<StatementBatch, CliError> {
    let batch = if offline_guess {
        differ.diff(tables, current, &ConventionGuess).await?
    } else {
        differ.diff(tables, current, &Offline).await?
    };
    Ok(batch)
}

async fn diff_live(
    differ: &Differ,
    tables: &[TableModel],
    url: &str,
) -> Result<StatementBatch, CliError> {
    let driver: Driver = differ.config().driver.parse()?;
    tracing::info!(database = %mask_password(url), %driver, "connecting");

    match driver {
        Driver::Postgres => {
            let (client, connection) =
                tokio_postgres::connect(url, tokio_postgres::NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "database connection error");
                }
            });

            let catalog = PgCatalog::new(&client);
            let current = catalog.snapshot().await?;
            Ok(differ.diff(tables, &current, &catalog).await?)
        }
        Driver::MySql => {
            let pool = sqlx::mysql::MySqlPoolOptions::new()
                .max_connections(1)
                .connect(url)
                .await?;

            let catalog = MySqlCatalog::new(&pool);
            let current = catalog.snapshot().await?;
            let batch = differ.diff(tables, &current, &catalog).await;
            pool.close().await;
            Ok(batch?)
        }
    }
}

/// Driver implied by a database URL's scheme when none is configured.
fn driver_for_url(url: Option<&str>) -> &'static str {
    match url {
        Some(url) if url.starts_with("mysql://") || url.starts_with("mariadb://") => "mysql",
        Some(_) => "postgres",
        None => "mysql",
    }
}

fn write_migration(dir: &Path, path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::create_dir_all(dir).map_err(|e| CliError::Io(e.to_string()))?;
    std::fs::write(path, contents).map_err(|e| CliError::Io(e.to_string()))
}

/// Mask password in database URL for display
fn mask_password(url: &str) -> String {
    // Simple masking: replace password between :// and @
    if let Some(start) = url.find("://") {
        if let Some(at) = url.find('@') {
            let prefix = &url[..start + 3];
            let suffix = &url[at..];
            if let Some(colon) = url[start + 3..at].find(':') {
                let user = &url[start + 3..start + 3 + colon];
                return format!("{}{}:***{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

/// Everything that can stop a command.
#[derive(Debug)]
enum CliError {
    Config(config::ConfigError),
    Input(input::InputError),
    Drift(drift::Error),
    Postgres(tokio_postgres::Error),
    MySql(sqlx::Error),
    /// No `--models` flag and no `models` entry in the config file
    MissingModels,
    Io(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Input(e) => write!(f, "{}", e),
            CliError::Drift(e) => write!(f, "{}", e),
            CliError::Postgres(e) => write!(f, "database error: {}", e),
            CliError::MySql(e) => write!(f, "database error: {}", e),
            CliError::MissingModels => write!(
                f,
                "No model file given: pass --models or set `models` in .config/drift.styx"
            ),
            CliError::Io(e) => write!(f, "Failed to write migration: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<input::InputError> for CliError {
    fn from(e: input::InputError) -> Self {
        CliError::Input(e)
    }
}

impl From<drift::Error> for CliError {
    fn from(e: drift::Error) -> Self {
        CliError::Drift(e)
    }
}

impl From<tokio_postgres::Error> for CliError {
    fn from(e: tokio_postgres::Error) -> Self {
        CliError::Postgres(e)
    }
}

impl From<sqlx::Error> for CliError {
    fn from(e: sqlx::Error) -> Self {
        CliError::MySql(e)
    }
}
