//! Delimited text loading

use crate::error::{Result, TabtrainError};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Separator used by uploads unless configured otherwise
pub const DEFAULT_DELIMITER: u8 = b';';

/// An uploaded table: ordered, uniquely named columns of numeric or textual values
#[derive(Debug, Clone)]
pub struct RawTable {
    frame: DataFrame,
}

impl RawTable {
    /// Wrap an already parsed frame
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        if frame.width() == 0 {
            return Err(TabtrainError::InvalidInput(
                "table has no columns".to_string(),
            ));
        }
        Ok(Self { frame })
    }

    /// Column names in table order
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame
            .get_column_names()
            .into_iter()
            .any(|col| col.as_str() == name)
    }

    pub fn n_rows(&self) -> usize {
        self.frame.height()
    }

    pub fn n_columns(&self) -> usize {
        self.frame.width()
    }

    /// Underlying polars frame
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

/// Parses delimited text with a header row into a [`RawTable`]
#[derive(Debug, Clone)]
pub struct TableLoader {
    /// Field separator
    delimiter: u8,
    /// Rows scanned for dtype inference (`None` scans the whole input)
    infer_schema_length: Option<usize>,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            infer_schema_length: None,
        }
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Limit dtype inference to the first `rows` rows
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Parse raw delimited content
    pub fn parse(&self, content: &[u8]) -> Result<RawTable> {
        if content.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(TabtrainError::InvalidInput("content is empty".to_string()));
        }

        let start = Instant::now();
        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(Cursor::new(content.to_vec()))
            .finish()
            .map_err(|e| TabtrainError::InvalidInput(format!("could not parse table: {}", e)))?;

        let table = RawTable::from_frame(frame)?;
        debug!(
            rows = table.n_rows(),
            columns = table.n_columns(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Parsed delimited table"
        );
        Ok(table)
    }

    /// Read and parse a file from disk
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<RawTable> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        info!(path = %path.display(), bytes = content.len(), "Loading table");
        self.parse(&content)
    }
}
