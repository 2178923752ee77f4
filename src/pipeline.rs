use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{info, warn};

use crate::aggregation::Query;
use crate::clean::{clean, repair_stock_flags, CleanReport, RepairOutcome};
use crate::config::PipelineConfig;
use crate::error::InventoryError;
use crate::loader;
use crate::table::InventoryTable;
use crate::validate::{validate, ValidationReport};

/// One query's result set.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub query: Query,
    pub frame: DataFrame,
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Validation of the table as loaded.
    pub initial: ValidationReport,
    pub cleaned: CleanReport,
    pub repair: Option<RepairOutcome>,
    /// Validation of the cleaned table.
    pub after_clean: ValidationReport,
    pub table: InventoryTable,
    pub results: Vec<QueryResult>,
    pub exported: Vec<PathBuf>,
}

/// Loader → validator → cleaner → validator → aggregator.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured source and run every stage.
    pub fn run(&self) -> Result<PipelineRun, InventoryError> {
        let table = loader::load_path(&self.config.source)?;
        self.run_table(table)
    }

    /// Run every stage on an already loaded table.
    pub fn run_table(&self, mut table: InventoryTable) -> Result<PipelineRun, InventoryError> {
        self.config.validate()?;

        let loaded = table.height();
        let initial = validate(&table)?;
        let cleaned = clean(&mut table)?;
        let repair = match self.config.stock_repair {
            Some(strategy) => Some(repair_stock_flags(&mut table, strategy)?),
            None => None,
        };

        let after_clean = validate(&table)?;
        if !after_clean.non_positive_price.is_empty() {
            warn!(
                remaining = after_clean.non_positive_price.len(),
                "non-positive prices survived cleaning"
            );
        }

        let options = self.config.query_options();
        let results = Query::ALL
            .into_iter()
            .map(|query| {
                Ok(QueryResult {
                    query,
                    frame: query.run(&table, &options)?,
                })
            })
            .collect::<Result<Vec<_>, InventoryError>>()?;

        let exported = match &self.config.output_dir {
            Some(dir) => export_results(&results, dir)?,
            None => Vec::new(),
        };

        info!(
            loaded,
            remaining = table.height(),
            purged = cleaned.purged.len(),
            queries = results.len(),
            exported = exported.len(),
            "inventory pipeline finished"
        );

        Ok(PipelineRun {
            initial,
            cleaned,
            repair,
            after_clean,
            table,
            results,
            exported,
        })
    }
}

/// Write each result to `<dir>/<slug>.csv`, creating `dir` if needed.
pub fn export_results(
    results: &[QueryResult],
    dir: &Path,
) -> Result<Vec<PathBuf>, InventoryError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(results.len());
    for result in results {
        let path = dir.join(format!("{}.csv", result.query.slug()));
        let mut file = File::create(&path)?;
        let mut frame = result.frame.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut frame)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "exported query results");
    Ok(written)
}

