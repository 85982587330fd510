use crate::domain::transaction::{transaction_id, NewTransaction, TransactionRecord, COLUMNS};
use crate::notice::{NoticeSource, Outcome};
use crate::storage::lock::{lock_path_for, try_acquire_store_lock};
use anyhow::Context;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transaction store is busy (lock held at {})", .0.display())]
    Busy(PathBuf),

    #[error("transaction file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("transaction file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction file CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no transaction id left after {0}")]
    IdsExhausted(String),
}

/// Append-only transaction log kept as a single CSV file. Every append rewrites the whole file
/// under a `<path>.lock` lock file.
#[derive(Debug, Clone)]
pub struct TransactionStore {
    path: PathBuf,
}

impl TransactionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // `true` when the file was created.
    pub fn ensure_initialized(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.write_all(&[])?;
        tracing::info!(path = %self.path.display(), "created empty transaction file");
        Ok(true)
    }

    pub fn load_all(&self) -> Outcome<Vec<TransactionRecord>> {
        let res = self
            .read_strict()
            .with_context(|| format!("failed to load transactions from {}", self.path.display()));
        Outcome::from_result(NoticeSource::TransactionStore, res)
    }

    pub fn read_strict(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let file = std::fs::File::open(&self.path)?;
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut idx = [0usize; COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, col) in idx.iter_mut().zip(COLUMNS) {
            match headers.iter().position(|h| h == col) {
                Some(i) => *slot = i,
                None => missing.push(col.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(StoreError::MissingColumns(missing));
        }

        let mut out = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let cell = |i: usize| row.get(idx[i]).unwrap_or("").to_string();
            out.push(TransactionRecord {
                id_transaksi: cell(0),
                tanggal: cell(1),
                nama_pelanggan: cell(2),
                layanan: cell(3),
                harga: cell(4),
            });
        }
        Ok(out)
    }

    pub fn append(&self, tx: NewTransaction) -> Result<TransactionRecord, StoreError> {
        let _lock = try_acquire_store_lock(&self.path)?
            .ok_or_else(|| StoreError::Busy(lock_path_for(&self.path)))?;

        let mut records = match self.read_strict() {
            Ok(records) => records,
            Err(StoreError::Io(err)) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(StoreError::MissingColumns(_)) if self.is_blank() => Vec::new(),
            // Never rewrite a file we could not understand.
            Err(err) => return Err(err),
        };

        let seq = next_sequence(&records)?;
        let record = tx.into_record(seq);
        records.push(record.clone());
        self.write_all(&records)?;

        tracing::info!(
            id = %record.id_transaksi,
            price = %record.harga,
            total_records = records.len(),
            "transaction appended"
        );
        Ok(record)
    }

    fn is_blank(&self) -> bool {
        std::fs::read(&self.path)
            .map(|raw| raw.iter().all(|b| b.is_ascii_whitespace()))
            .unwrap_or(false)
    }

    fn write_all(&self, records: &[TransactionRecord]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
            wtr.write_record(COLUMNS)?;
            for record in records {
                wtr.write_record(record.clone().into_row())?;
            }
            wtr.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

// One past the highest issued sequence. For an untouched file that is `len + 1`.
fn next_sequence(records: &[TransactionRecord]) -> Result<u64, StoreError> {
    let max_seq = records
        .iter()
        .filter_map(TransactionRecord::sequence)
        .max()
        .unwrap_or(0)
        .max(records.len() as u64);
    max_seq
        .checked_add(1)
        .ok_or_else(|| StoreError::IdsExhausted(transaction_id(max_seq)))
}
