use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store file {0} has no symbol column")]
    MissingSymbolColumn(PathBuf),
}
