//! Pipeline orchestration for ETL operations

use super::{Extractor, Loader, Transformer};
use crate::audit::AuditLog;
use crate::error::Result;
use crate::query::{QueryRunner, QuerySpec};
use crate::table::Dataset;

/// Rows written to one destination
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub destination: String,
    pub rows: usize,
}

/// Result of one post-load query
#[derive(Debug)]
pub struct QueryOutcome {
    pub label: String,
    pub result: Result<Dataset>,
}

/// What a successful run did
#[derive(Debug, Default)]
pub struct RunSummary {
    pub extracted: usize,
    pub transformed: usize,
    pub loads: Vec<LoadOutcome>,
    pub queries: Vec<QueryOutcome>,
}

/// ETL Pipeline that orchestrates Extract, Transform, and Load operations
///
/// Every stage boundary and every failure is written to the audit log.
/// Stages run strictly in order; a failing stage is logged once and the
/// error is returned without touching later stages.
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `T`: Transformer type
///
/// # Example
/// ```no_run
/// use tabular_etl::audit::AuditLog;
/// use tabular_etl::etl::{Pipeline, TransformChain};
/// use tabular_etl::sources::FileGlobExtractor;
/// use tabular_etl::storage::CsvWriter;
/// use tabular_etl::table::Schema;
///
/// # async fn example() -> tabular_etl::Result<()> {
/// let extractor = FileGlobExtractor::in_dir(".", Schema::new(["name", "height", "weight"]));
/// let pipeline = Pipeline::new(extractor, TransformChain::new(), AuditLog::new("log_file.txt"))
///     .with_loader(CsvWriter::new("transformed_data.csv"));
///
/// let summary = pipeline.run().await?;
/// println!("Loaded {} rows", summary.transformed);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, T> {
    extractor: E,
    transformer: T,
    loaders: Vec<Box<dyn Loader>>,
    queries: Vec<QuerySpec>,
    audit: AuditLog,
}

impl<E, T> Pipeline<E, T>
where
    E: Extractor,
    T: Transformer,
{
    /// Create a new pipeline with no destinations
    pub fn new(extractor: E, transformer: T, audit: AuditLog) -> Self {
        Self {
            extractor,
            transformer,
            loaders: Vec::new(),
            queries: Vec::new(),
            audit,
        }
    }

    /// Add a destination; loaders run in the order they were added
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn add_loader(&mut self, loader: Box<dyn Loader>) {
        self.loaders.push(loader);
    }

    /// Add a read-only query to run after every loader has finished
    pub fn with_query(mut self, query: QuerySpec) -> Self {
        self.queries.push(query);
        self
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Run the complete ETL pipeline
    ///
    /// Steps:
    /// 1. Extract the dataset from the source
    /// 2. Transform it
    /// 3. Load it to every destination
    /// 4. Run the post-load queries
    ///
    /// # Errors
    /// Returns the first extract, transform or load error. Query failures
    /// are logged and reported in the summary instead.
    pub async fn run(&self) -> Result<RunSummary> {
        self.audit.record("ETL Job Started")?;
        let mut summary = RunSummary::default();

        // Extract
        self.audit.record(format!(
            "Extract phase Started: {}",
            self.extractor.describe()
        ))?;
        let extracted = self.checked("Extract", self.extractor.extract().await)?;
        summary.extracted = extracted.len();
        self.audit.record(format!(
            "Extract phase Ended: {} rows",
            summary.extracted
        ))?;

        if extracted.is_empty() {
            log::warn!("No rows extracted, continuing with an empty dataset");
        }

        // Transform
        self.audit.record("Transform phase Started")?;
        let transformed = self.checked("Transform", self.transformer.transform(extracted))?;
        summary.transformed = transformed.len();
        self.audit.record(format!(
            "Transform phase Ended: {} rows",
            summary.transformed
        ))?;

        // Load
        self.checked("Load", transformed.schema().ensure_unique())?;
        for loader in &self.loaders {
            let rows = self.load_into(loader.as_ref(), &transformed)?;
            summary.loads.push(LoadOutcome {
                destination: loader.destination(),
                rows,
            });
        }

        // Query
        for spec in &self.queries {
            summary.queries.push(self.run_query(spec));
        }

        self.audit.record("ETL Job Ended")?;
        Ok(summary)
    }

    fn load_into(&self, loader: &dyn Loader, dataset: &Dataset) -> Result<usize> {
        let destination = loader.destination();
        self.audit
            .record(format!("Load phase Started: {}", destination))?;
        let rows = self.checked("Load", loader.load(dataset))?;
        self.audit.record(format!(
            "Load phase Ended: {} rows written to {}",
            rows, destination
        ))?;
        Ok(rows)
    }

    fn run_query(&self, spec: &QuerySpec) -> QueryOutcome {
        let label = spec.label();
        let result = self.try_query(spec, &label);
        if let Err(err) = &result {
            self.note_failure(&format!("Query failed ({}): {}", label, err));
        }
        QueryOutcome { label, result }
    }

    fn try_query(&self, spec: &QuerySpec, label: &str) -> Result<Dataset> {
        self.audit.record(format!("Query Started: {}", label))?;
        let result = QueryRunner::open(&spec.database).run(&spec.sql)?;
        self.audit
            .record(format!("Query returned {} rows: {}", result.len(), label))?;

        if let Some(target) = &spec.output {
            let loader = target.loader();
            let destination = loader.destination();
            self.audit
                .record(format!("Query results save Started: {}", destination))?;
            let rows = loader.load(&result)?;
            self.audit.record(format!(
                "Query results saved: {} rows written to {}",
                rows, destination
            ))?;
        }
        Ok(result)
    }

    /// Log a failed stage exactly once, then hand the error back
    fn checked<V>(&self, stage: &str, result: Result<V>) -> Result<V> {
        result.inspect_err(|err| self.note_failure(&format!("{} phase failed: {}", stage, err)))
    }

    fn note_failure(&self, message: &str) {
        if let Err(log_err) = self.audit.record_failure(message) {
            log::warn!("Could not write audit entry: {}", log_err);
        }
    }
}
