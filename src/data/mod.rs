//! Dataset loading and the single active dataset
//!
//! - [`TableLoader`] parses delimited text into a [`RawTable`]
//! - [`DatasetStore`] holds the table the next training run will use

mod loader;
mod store;

pub use loader::{RawTable, TableLoader, DEFAULT_DELIMITER};
pub use store::DatasetStore;
