//! Storage layer: key-value persistence for saved calculations, Parquet export.

mod error;
pub use error::StoreError;

pub mod calculations;
pub mod kv;

pub use calculations::{CalculationStore, SavedCalculation, SavedRef};
pub use kv::{FileStore, KvStore, MemoryStore};

#[cfg(feature = "parquet")]
mod export;
#[cfg(feature = "parquet")]
pub use export::{read_parquet, write_estimates_parquet};
