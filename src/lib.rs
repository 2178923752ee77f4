//! Cleaning and analysis of a flat retail inventory table.
//!
//! The stages are plain functions over an explicit [`InventoryTable`]:
//! [`loader`] builds it, [`validate`] reports invariant violations,
//! [`clean`] normalizes price units and purges invalid prices, and
//! [`aggregation`] answers the fixed catalog of analysis queries.
//! [`pipeline::Pipeline`] runs them all in order.

pub mod aggregation;
pub mod clean;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod validate;

#[cfg(feature = "python")]
mod model;

pub use aggregation::{Query, QueryOptions};
pub use clean::{CleanReport, RepairOutcome, StockFlagRepair};
pub use config::PipelineConfig;
pub use error::InventoryError;
pub use pipeline::{Pipeline, PipelineRun, QueryResult};
pub use table::{InventoryRecord, InventoryTable, RawRecord};
pub use validate::{ValidationReport, Violation};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::model::InventoryModel;
    use crate::schema;

    /// Export schema constants as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Inventory columns
        let inventory = PyModule::new(m.py(), "inventory")?;
        inventory.add("SKU_ID", schema::inventory::SKU_ID)?;
        inventory.add("CATEGORY", schema::inventory::CATEGORY)?;
        inventory.add("NAME", schema::inventory::NAME)?;
        inventory.add("MRP", schema::inventory::MRP)?;
        inventory.add("DISCOUNT_PERCENT", schema::inventory::DISCOUNT_PERCENT)?;
        inventory.add("AVAILABLE_QUANTITY", schema::inventory::AVAILABLE_QUANTITY)?;
        inventory.add(
            "DISCOUNTED_SELLING_PRICE",
            schema::inventory::DISCOUNTED_SELLING_PRICE,
        )?;
        inventory.add("WEIGHT_IN_GMS", schema::inventory::WEIGHT_IN_GMS)?;
        inventory.add("OUT_OF_STOCK", schema::inventory::OUT_OF_STOCK)?;
        inventory.add("QUANTITY", schema::inventory::QUANTITY)?;
        m.add_submodule(&inventory)?;

        // Derived query columns
        let derived = PyModule::new(m.py(), "derived")?;
        derived.add("REVENUE", schema::derived::REVENUE)?;
        derived.add("TOTAL_REVENUE", schema::derived::TOTAL_REVENUE)?;
        derived.add("AVG_DISCOUNT", schema::derived::AVG_DISCOUNT)?;
        derived.add("PRICE_PER_GRAM", schema::derived::PRICE_PER_GRAM)?;
        derived.add("TOTAL_WEIGHT_IN_GMS", schema::derived::TOTAL_WEIGHT_IN_GMS)?;
        derived.add("TOTAL_COUNT", schema::derived::TOTAL_COUNT)?;
        derived.add("OUT_OF_STOCK_COUNT", schema::derived::OUT_OF_STOCK_COUNT)?;
        derived.add("OUT_OF_STOCK_RATE", schema::derived::OUT_OF_STOCK_RATE)?;
        derived.add("REVENUE_RANK", schema::derived::REVENUE_RANK)?;
        derived.add("WEIGHT_CATEGORY", schema::derived::WEIGHT_CATEGORY)?;
        m.add_submodule(&derived)?;

        // Weight buckets
        let weight_bucket = PyModule::new(m.py(), "weight_bucket")?;
        weight_bucket.add("LOW", schema::weight_bucket::LOW)?;
        weight_bucket.add("MEDIUM", schema::weight_bucket::MEDIUM)?;
        weight_bucket.add("BULK", schema::weight_bucket::BULK)?;
        m.add_submodule(&weight_bucket)?;

        Ok(())
    }

    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<InventoryModel>()?;
        add_schema_exports(m)?;
        Ok(())
    }
}
