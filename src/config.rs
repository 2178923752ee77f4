use std::path::PathBuf;

use crate::aggregation::QueryOptions;
use crate::clean::StockFlagRepair;
use crate::error::InventoryError;
use crate::schema::thresholds;

/// Environment variable naming the inventory data file.
pub const SOURCE_ENV: &str = "INVENTORY_SOURCE";
/// Environment variable naming the directory query results are written to.
pub const OUTPUT_DIR_ENV: &str = "INVENTORY_OUTPUT_DIR";

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// CSV or Parquet file to load.
    pub source: PathBuf,
    /// Write each query result as `<slug>.csv` here (default: no export).
    pub output_dir: Option<PathBuf>,
    /// Rows returned by the top-discounts query (default: 10).
    pub top_n: usize,
    /// Stock-flag repair applied after cleaning (default: report only).
    pub stock_repair: Option<StockFlagRepair>,
}

impl PipelineConfig {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: None,
            top_n: thresholds::DEFAULT_TOP_N,
            stock_repair: None,
        }
    }

    /// Read the configuration from the process environment. An explicit
    /// `source` (e.g. a command-line argument) wins over `INVENTORY_SOURCE`.
    pub fn from_env(source: Option<String>) -> Result<Self, InventoryError> {
        Self::from_vars(source, |key| std::env::var(key).ok())
    }

    pub fn from_vars(
        source: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, InventoryError> {
        let source = source
            .or_else(|| lookup(SOURCE_ENV))
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                InventoryError::Config(format!(
                    "no data source given; pass a path or set {SOURCE_ENV}"
                ))
            })?;

        let mut config = Self::new(source);
        config.output_dir = lookup(OUTPUT_DIR_ENV)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        Ok(config)
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_stock_repair(mut self, strategy: StockFlagRepair) -> Self {
        self.stock_repair = Some(strategy);
        self
    }

    pub fn validate(&self) -> Result<(), InventoryError> {
        self.query_options().validate()
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions { top_n: self.top_n }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn argument_wins_over_environment() {
        let env = vars(&[(SOURCE_ENV, "env.csv")]);
        let config =
            PipelineConfig::from_vars(Some("arg.csv".into()), |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.source, PathBuf::from("arg.csv"));
        assert_eq!(config.output_dir, None);
        assert_eq!(config.top_n, 10);
    }

    #[test]
    fn environment_supplies_source_and_output() {
        let env = vars(&[(SOURCE_ENV, "zepto.csv"), (OUTPUT_DIR_ENV, "out")]);
        let config = PipelineConfig::from_vars(None, |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.source, PathBuf::from("zepto.csv"));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn missing_source_is_a_config_error() {
        let err = PipelineConfig::from_vars(None, |_| None).unwrap_err();
        assert!(matches!(err, InventoryError::Config(_)));
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let config = PipelineConfig::new("a.csv").with_top_n(0);
        assert!(config.validate().is_err());
    }
}
