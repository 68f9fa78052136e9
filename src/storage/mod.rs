//! RocksDB plumbing shared by anything that persists board records.
//!
//! The handle speaks bincode-serialized values in named column families.
//! Domain key layout (which ids go in which family, how cascade prefixes
//! are built) belongs to the callers; this module only knows bytes.

use crate::error::{Result, SoapboxError};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Tuning knobs for the on-disk store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Maximum number of open files.
    pub max_open_files: i32,
    /// Number of info log files to keep.
    pub keep_log_files: usize,
    /// Maximum WAL size in bytes.
    pub wal_size_limit: u64,
    /// Write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Maximum number of write buffers.
    pub max_write_buffers: i32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_open_files: 128,
            keep_log_files: 2,
            wal_size_limit: 32 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            max_write_buffers: 2,
        }
    }
}

impl DbConfig {
    fn build_options(&self) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(self.max_open_files);
        opts.set_keep_log_file_num(self.keep_log_files);
        opts.set_max_total_wal_size(self.wal_size_limit);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_write_buffer_size(self.write_buffer_size);
        opts.set_max_write_buffer_number(self.max_write_buffers);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Joins two key parts with a colon, the separator every cascade prefix uses.
pub fn composite_key(part1: &[u8], part2: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(part1.len() + 1 + part2.len());
    key.extend_from_slice(part1);
    key.push(b':');
    key.extend_from_slice(part2);
    key
}

// =============================================================================
// Handle
// =============================================================================

/// Column-family aware wrapper around one RocksDB instance.
pub struct DbHandle {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl DbHandle {
    /// Opens (or creates) the database with the given column families.
    pub fn open(
        db_path: impl AsRef<Path>,
        config: &DbConfig,
        column_families: &[&str],
    ) -> Result<Self> {
        let opts = config.build_options();
        let cf_opts = Options::default();
        let descriptors: Vec<_> = column_families
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()))
            .collect();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &opts,
            db_path.as_ref(),
            descriptors,
        )
        .map_err(|e| SoapboxError::storage(format!("failed to open database: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| SoapboxError::storage(format!("unknown column family '{}'", name)))
    }

    /// Serializes and stores a value.
    pub fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = bincode::serialize(value)
            .map_err(|e| SoapboxError::serialization(format!("failed to encode record: {}", e)))?;

        trace!(cf = cf_name, key_len = key.len(), value_bytes = bytes.len(), "db put");

        self.db
            .put_cf(&cf, key, &bytes)
            .map_err(|e| SoapboxError::storage(format!("failed to write record: {}", e)))
    }

    /// Loads and deserializes a value, `None` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(&cf, key) {
            Ok(Some(bytes)) => {
                let value: T = bincode::deserialize(&bytes).map_err(|e| {
                    SoapboxError::serialization(format!("failed to decode record: {}", e))
                })?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(SoapboxError::storage(format!("failed to read record: {}", e))),
        }
    }

    /// Deletes a key. Absent keys delete cleanly.
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| SoapboxError::storage(format!("failed to delete record: {}", e)))
    }

    /// Deletes every key under a prefix, returning how many went away.
    pub fn prefix_delete(&self, cf_name: &str, prefix: &[u8]) -> Result<usize> {
        let cf = self.cf(cf_name)?;
        let iter = self.db.prefix_iterator_cf(&cf, prefix);
        let mut deleted = 0;

        for item in iter {
            match item {
                Ok((key, _)) => {
                    if !key.starts_with(prefix) {
                        break;
                    }
                    self.db.delete_cf(&cf, &key).map_err(|e| {
                        SoapboxError::storage(format!("failed to delete record: {}", e))
                    })?;
                    deleted += 1;
                }
                Err(e) => {
                    warn!("iterator error during prefix delete: {}", e);
                }
            }
        }

        debug!(cf = cf_name, records_deleted = deleted, "db prefix delete");
        Ok(deleted)
    }

    /// Decodes every record in a column family.
    ///
    /// Undecodable records are skipped and counted, not fatal; a store
    /// that survived a crash should still load everything readable.
    pub fn collect_all<T: DeserializeOwned>(&self, cf_name: &str) -> Result<(Vec<T>, usize)> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        self.iterate_all(cf_name, |_, value| {
            match bincode::deserialize(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!("skipping undecodable record: {}", e);
                }
            }
            true
        })?;
        Ok((records, skipped))
    }

    /// Walks every entry in a column family.
    ///
    /// The callback returns false to stop early.
    pub fn iterate_all<F>(&self, cf_name: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        let cf = self.cf(cf_name)?;
        let iter = self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start);

        let mut count: usize = 0;
        for item in iter {
            match item {
                Ok((key, value)) => {
                    count += 1;
                    if !callback(&key, &value) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("iterator error during scan: {}", e);
                }
            }
        }

        debug!(cf = cf_name, records_iterated = count, "db full scan");
        Ok(())
    }
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle").field("db", &"RocksDB").finish()
    }
}
