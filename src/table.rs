use polars::prelude::*;

use crate::error::InventoryError;
use crate::schema::inventory;

/// One source row before loading, prices in minor currency units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub category: Option<String>,
    pub name: Option<String>,
    pub mrp: f64,
    pub discount_percent: f64,
    pub available_quantity: i64,
    pub discounted_selling_price: f64,
    pub weight_in_gms: Option<i64>,
    pub out_of_stock: bool,
    pub quantity: i64,
}

/// One row of a loaded table.
///
/// Numeric fields are optional because an empty source cell loads as null;
/// the validator reports those under `missing_fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub id: u32,
    pub category: Option<String>,
    pub name: Option<String>,
    pub mrp: Option<f64>,
    pub discount_percent: Option<f64>,
    pub available_quantity: Option<i64>,
    pub discounted_selling_price: Option<f64>,
    pub weight_in_gms: Option<i64>,
    pub out_of_stock: Option<bool>,
    pub quantity: Option<i64>,
}

/// The in-memory inventory table handed from stage to stage.
///
/// `normalized` records whether prices were already converted from minor to
/// major currency units, so the conversion can never run twice.
#[derive(Debug, Clone)]
pub struct InventoryTable {
    frame: DataFrame,
    normalized: bool,
}

impl InventoryTable {
    pub(crate) fn new(frame: DataFrame) -> Self {
        Self {
            frame,
            normalized: false,
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub(crate) fn replace_frame(&mut self, frame: DataFrame) {
        self.frame = frame;
    }

    pub(crate) fn mark_normalized(&mut self) {
        self.normalized = true;
    }

    pub(crate) fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Record identifiers in table order.
    pub fn ids(&self) -> Result<Vec<u32>, InventoryError> {
        ids_of(&self.frame)
    }

    /// Materialize every row as an [`InventoryRecord`].
    pub fn records(&self) -> Result<Vec<InventoryRecord>, InventoryError> {
        let df = &self.frame;
        let ids = df.column(inventory::SKU_ID)?.u32()?;
        let categories = df.column(inventory::CATEGORY)?.str()?;
        let names = df.column(inventory::NAME)?.str()?;
        let mrp = df.column(inventory::MRP)?.f64()?;
        let discount = df.column(inventory::DISCOUNT_PERCENT)?.f64()?;
        let available = df.column(inventory::AVAILABLE_QUANTITY)?.i64()?;
        let selling = df.column(inventory::DISCOUNTED_SELLING_PRICE)?.f64()?;
        let weight = df.column(inventory::WEIGHT_IN_GMS)?.i64()?;
        let out_of_stock = df.column(inventory::OUT_OF_STOCK)?.bool()?;
        let quantity = df.column(inventory::QUANTITY)?.i64()?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let id = ids.get(i).ok_or_else(|| InventoryError::MalformedRecord {
                row: i,
                column: inventory::SKU_ID.to_string(),
                value: "null".to_string(),
            })?;
            records.push(InventoryRecord {
                id,
                category: categories.get(i).map(str::to_string),
                name: names.get(i).map(str::to_string),
                mrp: mrp.get(i),
                discount_percent: discount.get(i),
                available_quantity: available.get(i),
                discounted_selling_price: selling.get(i),
                weight_in_gms: weight.get(i),
                out_of_stock: out_of_stock.get(i),
                quantity: quantity.get(i),
            });
        }
        Ok(records)
    }

    /// Look up a single record by id.
    pub fn record(&self, id: u32) -> Result<Option<InventoryRecord>, InventoryError> {
        Ok(self.records()?.into_iter().find(|r| r.id == id))
    }
}

pub(crate) fn ids_of(df: &DataFrame) -> Result<Vec<u32>, InventoryError> {
    Ok(df
        .column(inventory::SKU_ID)?
        .u32()?
        .into_iter()
        .flatten()
        .collect())
}
