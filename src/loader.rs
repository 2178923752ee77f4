use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::InventoryError;
use crate::schema::{inventory, source};
use crate::table::{InventoryTable, RawRecord};

// ── Sources ─────────────────────────────────────────────────────────────────

/// Load a CSV or Parquet file, picking the reader from the file extension.
pub fn load_path(path: impl AsRef<Path>) -> Result<InventoryTable, InventoryError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") | Some("txt") => load_csv(path),
        Some("parquet") | Some("pq") => load_parquet(path),
        _ => Err(InventoryError::UnsupportedSource(path.display().to_string())),
    }
}

/// Load a CSV file with a header row.
///
/// Every column is read as text and parsed here, so a non-numeric price is
/// reported with its row instead of being silently inferred as a string.
pub fn load_csv(path: impl AsRef<Path>) -> Result<InventoryTable, InventoryError> {
    let path = path.as_ref();
    info!(path = %path.display(), "reading inventory csv");
    let raw = read_csv_as_strings(path)?;
    load_frame(raw)
}

pub fn load_parquet(path: impl AsRef<Path>) -> Result<InventoryTable, InventoryError> {
    let path = path.as_ref();
    info!(path = %path.display(), "reading inventory parquet");
    let raw = ParquetReader::new(File::open(path)?).finish()?;
    load_frame(raw)
}

/// Build a table from typed rows.
pub fn from_rows(rows: &[RawRecord]) -> Result<InventoryTable, InventoryError> {
    let df = DataFrame::new(vec![
        Column::new(
            inventory::CATEGORY.into(),
            rows.iter()
                .map(|r| r.category.as_deref())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            inventory::NAME.into(),
            rows.iter().map(|r| r.name.as_deref()).collect::<Vec<_>>(),
        ),
        Column::new(
            inventory::MRP.into(),
            rows.iter().map(|r| r.mrp).collect::<Vec<f64>>(),
        ),
        Column::new(
            inventory::DISCOUNT_PERCENT.into(),
            rows.iter().map(|r| r.discount_percent).collect::<Vec<f64>>(),
        ),
        Column::new(
            inventory::AVAILABLE_QUANTITY.into(),
            rows.iter().map(|r| r.available_quantity).collect::<Vec<i64>>(),
        ),
        Column::new(
            inventory::DISCOUNTED_SELLING_PRICE.into(),
            rows.iter()
                .map(|r| r.discounted_selling_price)
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            inventory::WEIGHT_IN_GMS.into(),
            rows.iter().map(|r| r.weight_in_gms).collect::<Vec<_>>(),
        ),
        Column::new(
            inventory::OUT_OF_STOCK.into(),
            rows.iter().map(|r| r.out_of_stock).collect::<Vec<bool>>(),
        ),
        Column::new(
            inventory::QUANTITY.into(),
            rows.iter().map(|r| r.quantity).collect::<Vec<i64>>(),
        ),
    ])?;
    load_frame(df)
}

/// Turn a raw frame into an inventory table.
///
/// Columns are matched by source header (`discountPercent`, `Category`, ...)
/// or table name, ignoring case and surrounding whitespace. Columns already
/// carrying the target dtype are kept as they are; anything else is parsed
/// from its text form. Ids are assigned 1..=n in input order.
pub fn load_frame(raw: DataFrame) -> Result<InventoryTable, InventoryError> {
    let height = raw.height();

    let mut columns: Vec<Column> = Vec::with_capacity(inventory::ALL.len());
    columns.push(Column::new(
        inventory::SKU_ID.into(),
        (1..=height).map(|i| i as u32).collect::<Vec<u32>>(),
    ));

    for &(header, name) in source::HEADERS.iter() {
        let found = find_column(&raw, header, name);
        let column = match found {
            Some(column) => parse_column(column, name)?,
            None if source::OPTIONAL.contains(&name) => {
                debug!(column = name, "optional column absent, filling with nulls");
                Column::full_null(name.into(), height, &target_dtype(name))
            }
            None => return Err(InventoryError::MissingColumn(header.to_string())),
        };
        columns.push(column);
    }

    let df = DataFrame::new(columns)?.select(inventory::ALL)?;
    info!(rows = height, "loaded inventory table");
    Ok(InventoryTable::new(df))
}

// ── Private helpers ─────────────────────────────────────────────────────────

/// Read a CSV file with all columns as String dtype.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame, InventoryError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn find_column<'a>(raw: &'a DataFrame, header: &str, name: &str) -> Option<&'a Column> {
    raw.get_columns().iter().find(|c| {
        let n = c.name().trim();
        n.eq_ignore_ascii_case(header) || n.eq_ignore_ascii_case(name)
    })
}

fn target_dtype(name: &str) -> DataType {
    match name {
        inventory::CATEGORY | inventory::NAME => DataType::String,
        inventory::MRP | inventory::DISCOUNT_PERCENT | inventory::DISCOUNTED_SELLING_PRICE => {
            DataType::Float64
        }
        inventory::OUT_OF_STOCK => DataType::Boolean,
        _ => DataType::Int64,
    }
}

fn parse_column(raw: &Column, name: &str) -> Result<Column, InventoryError> {
    let dtype = target_dtype(name);
    if raw.dtype() == &dtype {
        if dtype == DataType::Float64 {
            reject_non_finite(raw, name)?;
        }
        let mut column = raw.clone();
        column.rename(name.into());
        return Ok(column);
    }

    let column = match dtype {
        DataType::String => raw.cast(&DataType::String)?.with_name(name.into()),
        DataType::Float64 => Column::new(name.into(), parse_cells(raw, name, parse_decimal)?),
        DataType::Boolean => Column::new(name.into(), parse_cells(raw, name, parse_flag)?),
        _ => Column::new(name.into(), parse_cells(raw, name, parse_integer)?),
    };
    Ok(column)
}

/// Typed float columns skip text parsing, so NaN and infinities are caught here.
fn reject_non_finite(raw: &Column, name: &str) -> Result<(), InventoryError> {
    let bad = raw
        .f64()?
        .into_iter()
        .enumerate()
        .find_map(|(row, v)| v.filter(|v| !v.is_finite()).map(|v| (row, v)));
    match bad {
        Some((row, value)) => Err(InventoryError::MalformedRecord {
            row,
            column: name.to_string(),
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}

/// Parse every cell of a column. Empty cells become null; anything else that
/// fails to parse aborts the load with the 0-based row index.
fn parse_cells<T>(
    raw: &Column,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>, InventoryError> {
    let text = raw.cast(&DataType::String)?;
    text.str()?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => {
                parse(value)
                    .map(Some)
                    .ok_or_else(|| InventoryError::MalformedRecord {
                        row,
                        column: name.to_string(),
                        value: value.to_string(),
                    })
            }
        })
        .collect()
}

fn parse_decimal(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_integer(cell: &str) -> Option<i64> {
    cell.parse::<i64>().ok().or_else(|| {
        parse_decimal(cell)
            .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

fn parse_flag(cell: &str) -> Option<bool> {
    match cell.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df!(
            "Category" => [Some("Snacks"), None],
            "name" => ["Chips", "Soda"],
            "mrp" => ["2500", "4000"],
            "discountPercent" => ["10", "0"],
            "availableQuantity" => ["3", "0"],
            "discountedSellingPrice" => ["2250", "4000"],
            "weightInGms" => ["150", ""],
            "outOfStock" => ["FALSE", "TRUE"],
            "quantity" => ["1", "6.0"],
            "extra" => ["x", "y"]
        )
        .unwrap()
    }

    #[test]
    fn load_frame_assigns_ids_and_types() {
        let table = load_frame(raw_frame()).unwrap();
        assert_eq!(table.ids().unwrap(), vec![1, 2]);
        assert!(!table.is_normalized());

        let names: Vec<&str> = table
            .frame()
            .get_column_names_str()
            .into_iter()
            .collect();
        assert_eq!(names, inventory::ALL.to_vec());

        let records = table.records().unwrap();
        assert_eq!(records[0].category.as_deref(), Some("Snacks"));
        assert_eq!(records[0].mrp, Some(2500.0));
        assert_eq!(records[0].weight_in_gms, Some(150));
        assert_eq!(records[1].category, None);
        assert_eq!(records[1].weight_in_gms, None);
        assert_eq!(records[1].out_of_stock, Some(true));
        assert_eq!(records[1].quantity, Some(6));
    }

    #[test]
    fn non_numeric_price_names_the_row() {
        let mut raw = raw_frame();
        raw.with_column(Column::new("mrp".into(), ["2500", "abc"]))
            .unwrap();

        match load_frame(raw) {
            Err(InventoryError::MalformedRecord { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, inventory::MRP);
                assert_eq!(value, "abc");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_column_fails() {
        let raw = raw_frame().drop("discountPercent").unwrap();
        let err = load_frame(raw).unwrap_err();
        assert!(matches!(err, InventoryError::MissingColumn(c) if c == "discountPercent"));
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let raw = raw_frame().drop_many(["Category", "weightInGms"]);
        let table = load_frame(raw).unwrap();
        let records = table.records().unwrap();
        assert!(records
            .iter()
            .all(|r| r.category.is_none() && r.weight_in_gms.is_none()));
    }

    #[test]
    fn typed_rows_load_without_reparsing() {
        let rows = vec![RawRecord {
            name: Some("A".into()),
            mrp: 10000.0,
            discounted_selling_price: 8000.0,
            available_quantity: 5,
            ..Default::default()
        }];
        let table = from_rows(&rows).unwrap();
        let record = table.record(1).unwrap().unwrap();
        assert_eq!(record.name.as_deref(), Some("A"));
        assert_eq!(record.discounted_selling_price, Some(8000.0));
        assert_eq!(record.out_of_stock, Some(false));
    }

    #[test]
    fn non_finite_typed_prices_are_malformed() {
        let rows = vec![RawRecord {
            name: Some("A".into()),
            mrp: f64::NAN,
            discounted_selling_price: 100.0,
            ..Default::default()
        }];
        match from_rows(&rows) {
            Err(InventoryError::MalformedRecord { row, column, value }) => {
                assert_eq!(row, 0);
                assert_eq!(column, inventory::MRP);
                assert_eq!(value, "NaN");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }

        let rows = vec![
            RawRecord {
                name: Some("A".into()),
                mrp: 100.0,
                discounted_selling_price: 90.0,
                ..Default::default()
            },
            RawRecord {
                name: Some("B".into()),
                mrp: 100.0,
                discounted_selling_price: f64::INFINITY,
                ..Default::default()
            },
        ];
        match from_rows(&rows) {
            Err(InventoryError::MalformedRecord { row, column, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, inventory::DISCOUNTED_SELLING_PRICE);
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_path("inventory.xlsx").unwrap_err();
        assert!(matches!(err, InventoryError::UnsupportedSource(_)));
    }

    #[test]
    fn flag_and_integer_parsing() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_integer("12"), Some(12));
        assert_eq!(parse_integer("12.0"), Some(12));
        assert_eq!(parse_integer("12.5"), None);
        assert_eq!(parse_decimal("NaN"), None);
    }
}
