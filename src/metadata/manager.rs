use std::collections::HashMap;

use crate::{error::Result, record::{Schema, TableInfo}, tx::transaction::Transaction};

use super::{
    index_mgr::{IndexInfo, IndexMgr},
    stat_mgr::StatMgr,
    table_mgr::TableMgr,
    view_mgr::ViewMgr,
};

/// The catalog as a whole: table, view, index, and statistics metadata, bundled as
/// owned sibling fields (no process-wide singleton — see the engine context module).
/// `ViewMgr`/`IndexMgr`/`StatMgr` hold no state referencing `table_mgr`; callers go
/// through this struct, which passes `&self.table_mgr` into each sub-manager call.
pub struct MetaDataMgr {
    table_mgr: TableMgr,
    view_mgr: ViewMgr,
    stat_mgr: StatMgr,
    index_mgr: IndexMgr,
}

impl MetaDataMgr {
    pub fn new(is_new: bool, tx: &mut Transaction) -> Result<Self> {
        let table_mgr = TableMgr::new(is_new, tx)?;
        let view_mgr = ViewMgr::new(is_new, &table_mgr, tx)?;
        let stat_mgr = StatMgr::new(&table_mgr, tx)?;
        let index_mgr = IndexMgr::new(is_new, &table_mgr, tx)?;
        Ok(Self {
            table_mgr,
            view_mgr,
            stat_mgr,
            index_mgr,
        })
    }

    pub fn create_table(&self, tblname: &str, schema: &Schema, tx: &mut Transaction) -> Result<()> {
        self.table_mgr.create_table(tblname, schema, tx)
    }

    pub fn get_table_info(&self, tblname: &str, tx: &mut Transaction) -> Result<TableInfo> {
        self.table_mgr.get_table_info(tblname, tx)
    }

    pub fn create_view(&self, viewname: &str, viewdef: &str, tx: &mut Transaction) -> Result<()> {
        self.view_mgr.create_view(&self.table_mgr, viewname, viewdef, tx)
    }

    pub fn get_view_def(&self, viewname: &str, tx: &mut Transaction) -> Result<Option<String>> {
        self.view_mgr.get_view_def(&self.table_mgr, viewname, tx)
    }

    pub fn create_index(
        &self,
        idxname: &str,
        tblname: &str,
        fldname: &str,
        tx: &mut Transaction,
    ) -> Result<()> {
        self.index_mgr.create_index(idxname, tblname, fldname, tx)
    }

    pub fn get_index_info(
        &mut self,
        tblname: &str,
        tx: &mut Transaction,
    ) -> Result<HashMap<String, IndexInfo>> {
        self.index_mgr
            .get_index_info(tblname, &self.table_mgr, &mut self.stat_mgr, tx)
    }

    pub fn get_stat_info(
        &mut self,
        tblname: &str,
        table_info: &TableInfo,
        tx: &mut Transaction,
    ) -> Result<super::stat_mgr::StatInfo> {
        self.stat_mgr.get_stat_info(tblname, table_info, &self.table_mgr, tx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::{tempdir, TempDir};

    use crate::{
        buffer::manager::BufferManager, file::manager::FileManager, log::manager::LogManager,
        tx::concurrency::lock_table::LockTable,
    };

    use super::*;

    fn new_tx() -> (Transaction, TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap().to_string();
        let log_file = format!("{db_dir}/simpledb.log");

        let file_manager = Arc::new(Mutex::new(FileManager::new(&db_dir, 400).unwrap()));
        let log_manager = Arc::new(Mutex::new(
            LogManager::new(Arc::clone(&file_manager), &log_file).unwrap(),
        ));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            8,
        )));
        let lock_table = Arc::new(Mutex::new(LockTable::new()));
        let tx = Transaction::new(file_manager, log_manager, buffer_manager, lock_table).unwrap();
        (tx, temp_dir)
    }

    #[test]
    fn bootstraps_all_four_system_tables_on_a_fresh_database() {
        let (mut tx, _dir) = new_tx();
        let mgr = MetaDataMgr::new(true, &mut tx).unwrap();

        for tblname in ["tblcat", "fldcat", "viewcat", "idxcat"] {
            mgr.get_table_info(tblname, &mut tx).unwrap();
        }

        tx.commit().unwrap();
    }

    #[test]
    fn reopening_an_existing_database_does_not_rebootstrap() {
        let (mut tx, _dir) = new_tx();
        {
            let mgr = MetaDataMgr::new(true, &mut tx).unwrap();
            let mut schema = Schema::new();
            schema.add_int_field("sid");
            mgr.create_table("students", &schema, &mut tx).unwrap();
        }
        tx.commit().unwrap();

        // A second MetaDataMgr over the same transaction, with is_new = false,
        // must see the table created above rather than re-bootstrapping it away.
        let mgr2 = MetaDataMgr::new(false, &mut tx).unwrap();
        let ti = mgr2.get_table_info("students", &mut tx).unwrap();
        assert!(ti.schema().has_field("sid"));
    }
}
