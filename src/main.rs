use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tabular_etl::cli::{check_config, run_pipeline, run_query};

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Rows shown when printing query results
const PREVIEW_ROWS: usize = 20;

/// Tabular ETL: extract files or web tables, transform them, load CSV, JSON or SQLite
#[derive(Parser)]
#[command(name = "tabetl", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source settings from, if it exists
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline described by a YAML file
    Run {
        /// Pipeline configuration file
        #[arg(default_value = "pipeline.yml")]
        config: PathBuf,
    },

    /// Validate a pipeline configuration without running it
    Check {
        /// Pipeline configuration file
        #[arg(default_value = "pipeline.yml")]
        config: PathBuf,
    },

    /// Run one read-only SQL query against a SQLite database
    Query {
        /// SQLite database file
        database: PathBuf,

        /// SQL statement to run
        sql: String,

        /// Save the result as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append query events to this audit log
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if Path::new(&cli.env).exists() {
        dotenvy::from_filename(&cli.env)?;
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    match cli.command {
        Commands::Run { config } => {
            log::info!("Running pipeline {}", config.display().bright_black());
            let summary = run_pipeline(&config).await?;

            for load in &summary.loads {
                log::info!(
                    "{} {} row(s) to {}",
                    "✓".green(),
                    load.rows,
                    load.destination.cyan()
                );
            }
            for query in &summary.queries {
                match &query.result {
                    Ok(result) => {
                        println!("{}", query.label.bold());
                        println!("{}\n", result.preview(PREVIEW_ROWS));
                    }
                    Err(err) => log::error!("{} {}: {}", "✗".red(), query.label, err),
                }
            }
        }
        Commands::Check { config } => {
            let definition = check_config(&config)?;
            log::info!(
                "{} {} is valid: {} transform step(s), {} sink(s), {} query(ies)",
                "✓".green(),
                config.display().bright_black(),
                definition.transforms.len(),
                definition.sinks.len(),
                definition.queries.len()
            );
        }
        Commands::Query {
            database,
            sql,
            output,
            log: audit_log,
        } => {
            log::info!("Querying {}", database.display().bright_black());
            let result = run_query(&database, &sql, output.as_deref(), audit_log.as_deref())?;
            println!("{}", result.preview(PREVIEW_ROWS));
            if let Some(output) = output {
                log::info!(
                    "Saved {} row(s) to {}",
                    result.len(),
                    output.display().cyan()
                );
            }
        }
    }

    Ok(())
}
