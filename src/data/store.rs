//! Process-lifetime holder of the current dataset

use super::RawTable;
use crate::error::{Result, TabtrainError};
use parking_lot::RwLock;
use tracing::info;

/// Owns the single active [`RawTable`]
///
/// An upload replaces the table wholesale. Trained models are not touched, so
/// a stale model may coexist with newly uploaded data until the next train.
#[derive(Debug, Default)]
pub struct DatasetStore {
    current: RwLock<Option<RawTable>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current table, discarding any previous one
    pub fn replace(&self, table: RawTable) {
        info!(
            rows = table.n_rows(),
            columns = table.n_columns(),
            "Dataset replaced"
        );
        *self.current.write() = Some(table);
    }

    /// Snapshot of the current table
    pub fn current(&self) -> Result<RawTable> {
        self.current
            .read()
            .clone()
            .ok_or(TabtrainError::NoDatasetLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
}
