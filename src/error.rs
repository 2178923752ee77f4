use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Malformed record at row {row}: column '{column}' has value '{value}'")]
    MalformedRecord {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Prices are already normalized to major currency units")]
    AlreadyNormalized,

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Config: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "python")]
impl From<InventoryError> for pyo3::PyErr {
    fn from(err: InventoryError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyRuntimeError, PyValueError};
        match err {
            InventoryError::MalformedRecord { .. }
            | InventoryError::MissingColumn(_)
            | InventoryError::UnsupportedSource(_)
            | InventoryError::Config(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}
