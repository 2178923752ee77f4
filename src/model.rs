use std::path::PathBuf;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3_polars::PyDataFrame;

use crate::aggregation::{Query, QueryOptions};
use crate::clean::{self, StockFlagRepair};
use crate::error::InventoryError;
use crate::loader;
use crate::schema::thresholds;
use crate::table::InventoryTable;
use crate::validate::{self, Violation};

#[pyclass]
pub struct InventoryModel {
    base_path: PathBuf,
    table: Option<InventoryTable>,
}

#[pymethods]
impl InventoryModel {
    #[new]
    #[pyo3(signature = (base_path=None))]
    fn new(base_path: Option<String>) -> Self {
        Self {
            base_path: PathBuf::from(base_path.unwrap_or_else(|| ".".to_string())),
            table: None,
        }
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load an inventory CSV or Parquet file relative to `base_path`.
    ///
    /// Required columns: name, mrp, discountPercent, availableQuantity,
    /// discountedSellingPrice, outOfStock, quantity.
    /// Optional columns: Category, weightInGms.
    /// Prices are expected in minor currency units.
    #[pyo3(signature = (filename=None))]
    fn load(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let path = self.base_path.join(filename.unwrap_or("inventory.csv"));
        let table = loader::load_path(path)?;
        Ok(self.replace_table(table))
    }

    /// Load from a DataFrame with the same columns as the CSV.
    fn load_dataframe(&mut self, df: PyDataFrame) -> PyResult<PyDataFrame> {
        let table = loader::load_frame(df.0)?;
        Ok(self.replace_table(table))
    }

    // ── Validation ──────────────────────────────────────────────────────────

    /// Ids of violating records, keyed by violation name.
    fn validate<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let report = validate::validate(self.table()?)?;
        let dict = PyDict::new(py);
        for violation in Violation::ALL {
            dict.set_item(violation.slug(), report.ids(violation).to_vec())?;
        }
        Ok(dict)
    }

    // ── Cleaning ────────────────────────────────────────────────────────────

    fn normalize_units(&mut self) -> PyResult<()> {
        clean::normalize_units(self.table_mut()?)?;
        Ok(())
    }

    /// Returns the ids of purged records.
    fn purge_invalid_prices(&mut self) -> PyResult<Vec<u32>> {
        Ok(clean::purge_invalid_prices(self.table_mut()?)?)
    }

    /// Normalize units then purge; returns the ids of purged records.
    fn clean(&mut self) -> PyResult<Vec<u32>> {
        Ok(clean::clean(self.table_mut()?)?.purged)
    }

    /// `strategy`: "trust_quantity" or "trust_flag".
    fn repair_stock_flags<'py>(
        &mut self,
        py: Python<'py>,
        strategy: &str,
    ) -> PyResult<Bound<'py, PyDict>> {
        let strategy = StockFlagRepair::from_slug(strategy).ok_or_else(|| {
            PyValueError::new_err(format!(
                "Invalid strategy: '{}'. Must be 'trust_quantity' or 'trust_flag'",
                strategy
            ))
        })?;
        let outcome = clean::repair_stock_flags(self.table_mut()?, strategy)?;
        let dict = PyDict::new(py);
        dict.set_item("repaired", outcome.repaired)?;
        dict.set_item("unresolved", outcome.unresolved)?;
        Ok(dict)
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Run one catalog query by name (see `queries()`).
    #[pyo3(signature = (name, top_n=thresholds::DEFAULT_TOP_N))]
    fn query(&self, name: &str, top_n: usize) -> PyResult<PyDataFrame> {
        let query = Query::from_slug(name)
            .ok_or_else(|| PyValueError::new_err(format!("Unknown query: '{}'", name)))?;
        let df = query.run(self.table()?, &QueryOptions { top_n })?;
        Ok(PyDataFrame(df))
    }

    #[staticmethod]
    fn queries() -> Vec<&'static str> {
        Query::ALL.iter().map(|q| q.slug()).collect()
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn table_df(&self) -> Option<PyDataFrame> {
        self.table.as_ref().map(|t| PyDataFrame(t.frame().clone()))
    }

    #[getter]
    fn is_normalized(&self) -> bool {
        self.table.as_ref().is_some_and(|t| t.is_normalized())
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

impl InventoryModel {
    fn replace_table(&mut self, table: InventoryTable) -> PyDataFrame {
        let df = PyDataFrame(table.frame().clone());
        self.table = Some(table);
        df
    }

    fn table(&self) -> Result<&InventoryTable, InventoryError> {
        self.table
            .as_ref()
            .ok_or_else(|| InventoryError::NotLoaded("inventory".into()))
    }

    fn table_mut(&mut self) -> Result<&mut InventoryTable, InventoryError> {
        self.table
            .as_mut()
            .ok_or_else(|| InventoryError::NotLoaded("inventory".into()))
    }
}
