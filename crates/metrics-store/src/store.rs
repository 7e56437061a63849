use market_core::{normalize_symbol, MetricField, MetricsRecord, NormalizedMetrics, SYMBOL_COLUMN};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Table of metrics rows keyed by symbol, kept as text cells so columns this
/// build does not know about survive a load/save cycle untouched.
///
/// Row order is first-insertion order. Rows are never removed.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    path: Option<PathBuf>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

fn default_columns() -> Vec<String> {
    std::iter::once(SYMBOL_COLUMN)
        .chain(MetricField::ALL.iter().map(|f| f.column()))
        .map(str::to_string)
        .collect()
}

impl MetricsStore {
    /// Store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            columns: default_columns(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Loads the table at `path`. A missing file gives an empty store; the
    /// file is only created by the first [`save`](Self::save).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path: Some(path.clone()),
            ..Self::in_memory()
        };

        if !path.exists() {
            tracing::debug!("Store {} does not exist yet", path.display());
            return Ok(store);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            // header-less empty file
            return Ok(store);
        }
        let symbol_idx = headers
            .iter()
            .position(|h| h == SYMBOL_COLUMN)
            .ok_or_else(|| StoreError::MissingSymbolColumn(path.clone()))?;

        // Keep the file's column order and append any columns it lacks
        let mut columns = headers.clone();
        for column in default_columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        store.columns = columns;

        for result in reader.records() {
            let record = result?;
            let Some(symbol) = record.get(symbol_idx).and_then(normalize_symbol) else {
                continue;
            };

            let mut row = vec![String::new(); store.columns.len()];
            for (i, value) in record.iter().enumerate().take(headers.len()) {
                row[i] = value.to_string();
            }
            row[symbol_idx] = symbol.clone();

            match store.index.get(&symbol) {
                // later duplicates win
                Some(&existing) => store.rows[existing] = row,
                None => {
                    store.index.insert(symbol, store.rows.len());
                    store.rows.push(row);
                }
            }
        }

        tracing::info!("Loaded {} rows from {}", store.rows.len(), path.display());
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        normalize_symbol(symbol).map_or(false, |s| self.index.contains_key(&s))
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Inserts or updates the row for `metrics.record.symbol`, writing only
    /// the supplied cells. A new row leaves unsupplied cells blank.
    pub fn upsert(&mut self, metrics: &NormalizedMetrics) -> UpsertOutcome {
        let symbol = metrics.record.symbol.clone();
        let (row_idx, outcome) = match self.index.get(&symbol) {
            Some(&idx) => (idx, UpsertOutcome::Updated),
            None => {
                let mut row = vec![String::new(); self.columns.len()];
                if let Some(i) = self.column_index(SYMBOL_COLUMN) {
                    row[i] = symbol.clone();
                }
                self.index.insert(symbol, self.rows.len());
                self.rows.push(row);
                (self.rows.len() - 1, UpsertOutcome::Inserted)
            }
        };

        for field in &metrics.supplied {
            let Some(col) = self.column_index(field.column()) else {
                continue;
            };
            self.rows[row_idx][col] = metrics.record.cell(*field).unwrap_or_default();
        }
        outcome
    }

    fn to_record(&self, row: &[String]) -> Option<MetricsRecord> {
        let symbol_idx = self.column_index(SYMBOL_COLUMN)?;
        let mut record = MetricsRecord::new(row.get(symbol_idx)?)?;
        for (column, value) in self.columns.iter().zip(row) {
            if let Some(field) = MetricField::from_column(column) {
                record.apply_cell(field, value);
            }
        }
        Some(record)
    }

    /// Every row as a record, in store order. Blank or unparseable cells
    /// take the record defaults.
    pub fn records(&self) -> Vec<MetricsRecord> {
        self.rows.iter().filter_map(|row| self.to_record(row)).collect()
    }

    pub fn get(&self, symbol: &str) -> Option<MetricsRecord> {
        let symbol = normalize_symbol(symbol)?;
        let idx = *self.index.get(&symbol)?;
        self.to_record(&self.rows[idx])
    }

    /// Writes the table to its path through a temporary file and a rename.
    /// No-op for an in-memory store.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(&self.columns)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;

        tracing::debug!("Saved {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::{FieldSet, ProviderKind};

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "metrics-store-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join("stock_data.csv")
    }

    fn metrics(symbol: &str, fields: &[(MetricField, f64)]) -> NormalizedMetrics {
        let mut record = MetricsRecord::new(symbol).unwrap();
        let mut supplied = FieldSet::new();
        for (field, value) in fields {
            record.set_number(*field, *value);
            supplied.insert(*field);
        }
        NormalizedMetrics {
            provider: ProviderKind::Yahoo,
            record,
            supplied,
        }
    }

    #[test]
    fn test_upsert_inserts_then_updates_supplied_fields() {
        let mut store = MetricsStore::in_memory();
        let first = metrics("aapl", &[(MetricField::Price, 180.0), (MetricField::PeRatio, 29.0)]);
        assert_eq!(store.upsert(&first), UpsertOutcome::Inserted);
        store.upsert(&metrics("MSFT", &[(MetricField::Price, 410.0)]));

        let second = metrics("AAPL", &[(MetricField::Price, 190.0)]);
        assert_eq!(store.upsert(&second), UpsertOutcome::Updated);

        assert_eq!(store.len(), 2);
        let aapl = store.get("AAPL").unwrap();
        assert_eq!(aapl.price, 190.0);
        // not supplied by the second upsert
        assert_eq!(aapl.pe_ratio, 29.0);
        assert_eq!(store.get("msft").unwrap().price, 410.0);
    }

    #[test]
    fn test_new_row_leaves_unsupplied_cells_blank() {
        let mut store = MetricsStore::in_memory();
        store.upsert(&metrics("KO", &[(MetricField::DividendYield, 0.03)]));

        let record = store.get("KO").unwrap();
        assert_eq!(record.beta, 1.0);
        assert_eq!(record.sector, "Unknown");
        assert!(record.debt_to_equity.is_none());
    }

    #[test]
    fn test_save_and_reopen() {
        let path = temp_path("roundtrip");
        let mut store = MetricsStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());

        store.upsert(&metrics("T", &[(MetricField::Price, 17.5), (MetricField::AnalystBuy, 6.0)]));
        store.upsert(&metrics("VZ", &[(MetricField::DebtToEquity, 1.9)]));
        store.save().unwrap();
        assert!(path.exists());

        let reopened = MetricsStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.records(), store.records());
        assert_eq!(reopened.get("T").unwrap().analyst_ratings.buy, 6);
        assert_eq!(reopened.get("VZ").unwrap().debt_to_equity, Some(1.9));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_unknown_columns_survive_and_missing_columns_are_added() {
        let path = temp_path("legacy");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "symbol,price,notes\nibm,187.3,watch\nko,61.0,\n",
        )
        .unwrap();

        let mut store = MetricsStore::open(&path).unwrap();
        assert_eq!(&store.columns()[..3], &["symbol", "price", "notes"]);
        assert!(store.columns().iter().any(|c| c == "debt_to_equity"));
        assert_eq!(store.get("IBM").unwrap().price, 187.3);

        store.upsert(&metrics("IBM", &[(MetricField::Beta, 0.7)]));
        store.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("symbol,price,notes,sector"));
        assert!(lines.next().unwrap().starts_with("IBM,187.3,watch,"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_without_symbol_column_is_rejected() {
        let path = temp_path("nosymbol");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "ticker,price\nAAPL,1\n").unwrap();

        let err = MetricsStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::MissingSymbolColumn(_)));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let mut store = MetricsStore::in_memory();
        store.upsert(&metrics("A", &[(MetricField::Price, 1.0)]));
        assert!(store.save().is_ok());
        assert!(store.path().is_none());
        assert!(store.contains(" a "));
    }
}
