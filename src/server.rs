use std::sync::{Arc, Mutex};

use tracing::info;

use crate::{
    buffer::manager::BufferManager,
    config::DbConfig,
    error::Result,
    file::manager::FileManager,
    log::manager::LogManager,
    metadata::MetaDataMgr,
    tx::{concurrency::lock_table::LockTable, transaction::Transaction},
};

/// A single open database: the shared file/log/buffer/lock infrastructure plus the
/// catalog, constructed once per database directory and handed to every transaction
/// (see the engine context redesign note: no process-wide singleton).
pub struct SimpleDb {
    file_manager: Arc<Mutex<FileManager>>,
    log_manager: Arc<Mutex<LogManager>>,
    buffer_manager: Arc<Mutex<BufferManager>>,
    lock_table: Arc<Mutex<LockTable>>,
    metadata_mgr: MetaDataMgr,
}

impl SimpleDb {
    /// Opens `db_dir`, creating it if necessary. If the directory already existed,
    /// runs a recovery pass before the catalog is touched.
    pub fn new(db_dir: &str, config: DbConfig) -> Result<Self> {
        let file_manager = Arc::new(Mutex::new(FileManager::new(db_dir, config.block_size)?));
        let is_new = file_manager.lock()?.is_new();

        let log_file = "simpledb.log";
        let log_manager = Arc::new(Mutex::new(LogManager::new(
            Arc::clone(&file_manager),
            log_file,
        )?));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::with_timeout(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            config.num_buffers,
            config.buffer_timeout,
        )));
        let lock_table = Arc::new(Mutex::new(LockTable::with_timeout(config.lock_timeout)));

        let mut startup_tx = Transaction::new(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            Arc::clone(&buffer_manager),
            Arc::clone(&lock_table),
        )?;

        if is_new {
            info!(db_dir, "initializing new database");
        } else {
            info!(db_dir, "recovering existing database");
            startup_tx.recover()?;
        }

        let metadata_mgr = MetaDataMgr::new(is_new, &mut startup_tx)?;
        startup_tx.commit()?;

        Ok(Self {
            file_manager,
            log_manager,
            buffer_manager,
            lock_table,
            metadata_mgr,
        })
    }

    pub fn new_tx(&self) -> Result<Transaction> {
        Transaction::new(
            Arc::clone(&self.file_manager),
            Arc::clone(&self.log_manager),
            Arc::clone(&self.buffer_manager),
            Arc::clone(&self.lock_table),
        )
    }

    pub fn metadata_mgr(&self) -> &MetaDataMgr {
        &self.metadata_mgr
    }

    pub fn metadata_mgr_mut(&mut self) -> &mut MetaDataMgr {
        &mut self.metadata_mgr
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::record::Schema;

    #[test]
    fn new_database_bootstraps_catalog_and_accepts_a_table() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let db = SimpleDb::new(db_dir, DbConfig::default()).unwrap();

        let mut tx = db.new_tx().unwrap();
        let mut schema = Schema::new();
        schema.add_int_field("sid");
        db.metadata_mgr().create_table("students", &schema, &mut tx).unwrap();
        let ti = db.metadata_mgr().get_table_info("students", &mut tx).unwrap();
        assert!(ti.schema().has_field("sid"));
        tx.commit().unwrap();
    }

    #[test]
    fn reopening_a_database_runs_recovery_and_keeps_the_catalog() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        {
            let db = SimpleDb::new(db_dir, DbConfig::default()).unwrap();
            let mut tx = db.new_tx().unwrap();
            let mut schema = Schema::new();
            schema.add_int_field("sid");
            db.metadata_mgr().create_table("students", &schema, &mut tx).unwrap();
            tx.commit().unwrap();
        }

        let db2 = SimpleDb::new(db_dir, DbConfig::default()).unwrap();
        let mut tx2 = db2.new_tx().unwrap();
        let ti = db2.metadata_mgr().get_table_info("students", &mut tx2).unwrap();
        assert!(ti.schema().has_field("sid"));
        tx2.commit().unwrap();
    }
}
