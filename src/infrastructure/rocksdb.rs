use crate::domain::ports::TransactionStore;
use crate::domain::transaction::Transaction;
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for storing transaction records.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent transaction store using RocksDB.
///
/// Records are kept as JSON under the transaction id, so persisted
/// snapshots carry only the masked card data. The same terminal-state rules
/// as the in-memory store apply: conflicting writes against a settled
/// record are rejected.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions])
            .map_err(|e| AuthError::Internal(Box::new(e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_TRANSACTIONS).ok_or_else(|| {
            AuthError::Internal(Box::new(std::io::Error::other(
                "Transactions column family not found",
            )))
        })
    }

    fn read(&self, id: Uuid) -> Result<Option<Transaction>> {
        let cf = self.cf()?;
        let result = self
            .db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| AuthError::Internal(Box::new(e)))?;

        match result {
            Some(bytes) => {
                let tx = serde_json::from_slice(&bytes)
                    .map_err(|e| AuthError::Internal(Box::new(e)))?;
                Ok(Some(tx))
            }
            None => Ok(None),
        }
    }

    fn write(&self, tx: &Transaction) -> Result<()> {
        let cf = self.cf()?;
        let value = serde_json::to_vec(tx).map_err(|e| AuthError::Internal(Box::new(e)))?;
        self.db
            .put_cf(cf, tx.id.as_bytes(), value)
            .map_err(|e| AuthError::Internal(Box::new(e)))?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn create(&self, tx: Transaction) -> Result<()> {
        if self.read(tx.id)?.is_some() {
            return Ok(());
        }
        self.write(&tx)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.read(id)
    }

    async fn update(&self, tx: Transaction) -> Result<()> {
        if let Some(existing) = self.read(tx.id)?
            && existing.status.is_terminal()
            && existing.status != tx.status
            && !existing.status.can_transition_to(tx.status)
        {
            return Err(AuthError::InvalidStateTransition {
                from: existing.status,
                to: tx.status,
            });
        }
        self.write(&tx)
    }
}
