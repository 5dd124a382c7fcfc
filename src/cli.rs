//! CLI helper functions

use crate::{
    audit::AuditLog,
    config::PipelineConfig,
    etl::RunSummary,
    query::QueryRunner,
    storage::CsvWriter,
    table::Dataset,
};
use eyre::{Context, Result};
use std::path::Path;

/// Run the pipeline described by a configuration file
///
/// Pipeline: configured extractor → transform steps → every sink → queries
///
/// Stage failures are already in the audit log when this returns an error.
pub async fn run_pipeline(config_path: impl AsRef<Path>) -> Result<RunSummary> {
    let config_path = config_path.as_ref();

    log::info!("Loading pipeline from {}", config_path.display());
    let config = PipelineConfig::read(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let pipeline = config.build().context("Failed to build pipeline")?;

    log::info!(
        "Running pipeline with {} sink(s), audit log {}",
        config.sinks.len(),
        config.log_file.display()
    );
    let summary = pipeline.run().await.context("ETL job failed")?;

    log::info!(
        "Extracted {} row(s), loaded {} row(s) into {} sink(s)",
        summary.extracted,
        summary.transformed,
        summary.loads.len()
    );
    Ok(summary)
}

/// Validate a configuration file and build its pipeline without running it
pub fn check_config(config_path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let config_path = config_path.as_ref();
    let config = PipelineConfig::read(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    config
        .build()
        .with_context(|| format!("Invalid pipeline in {}", config_path.display()))?;
    Ok(config)
}

/// Run one read-only query, optionally saving the result as CSV
///
/// With `log`, the query start, result and any failure are appended to that
/// audit log.
pub fn run_query(
    database: impl AsRef<Path>,
    sql: &str,
    output: Option<&Path>,
    log: Option<&Path>,
) -> Result<Dataset> {
    let database = database.as_ref();
    let audit = log.map(AuditLog::new);

    if let Some(audit) = &audit {
        audit.record(format!("Query Started: {}", sql))?;
    }

    let result = QueryRunner::open(database).run(sql).and_then(|dataset| {
        if let Some(path) = output {
            CsvWriter::new(path).write(&dataset)?;
        }
        Ok(dataset)
    });

    match (&audit, &result) {
        (Some(audit), Ok(dataset)) => {
            audit.record(format!("Query returned {} rows: {}", dataset.len(), sql))?;
        }
        (Some(audit), Err(err)) => {
            audit.record_failure(format!("Query failed ({}): {}", sql, err))?;
        }
        (None, _) => {}
    }

    result.with_context(|| format!("Query against {} failed", database.display()))
}
