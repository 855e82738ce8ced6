use std::collections::HashMap;

use tracing::debug;

use crate::{error::Result, record::{RecordFile, TableInfo}, tx::transaction::Transaction};

use super::table_mgr::TableMgr;

/// Block count, record count, and a guessed distinct-value count for one table.
/// The original fakes the distinct-value estimate rather than tracking it exactly.
#[derive(Debug, Clone, Copy)]
pub struct StatInfo {
    num_blocks: usize,
    num_recs: usize,
}

impl StatInfo {
    pub fn new(num_blocks: usize, num_recs: usize) -> Self {
        Self { num_blocks, num_recs }
    }

    pub fn blocks_accessed(&self) -> usize {
        self.num_blocks
    }

    pub fn records_output(&self) -> usize {
        self.num_recs
    }

    /// A guess, not a real count: `1 + num_recs / 3`, independent of which field.
    pub fn distinct_values(&self, _fldname: &str) -> usize {
        1 + self.num_recs / 3
    }
}

/// Table statistics computed on demand by scanning, cached, and refreshed every 100
/// calls to `get_stat_info` (spec.md §4.10's closing paragraph). Does not store a
/// `&TableMgr` borrow for the same reason `ViewMgr` doesn't: it's a sibling field on
/// `MetaDataMgr`.
pub struct StatMgr {
    table_stats: HashMap<String, StatInfo>,
    num_calls: usize,
}

impl StatMgr {
    pub fn new(table_mgr: &TableMgr, tx: &mut Transaction) -> Result<Self> {
        let mut mgr = Self {
            table_stats: HashMap::new(),
            num_calls: 0,
        };
        mgr.refresh_statistics(table_mgr, tx)?;
        Ok(mgr)
    }

    pub fn get_stat_info(
        &mut self,
        tblname: &str,
        table_info: &TableInfo,
        table_mgr: &TableMgr,
        tx: &mut Transaction,
    ) -> Result<StatInfo> {
        self.num_calls += 1;
        if self.num_calls > 100 {
            self.refresh_statistics(table_mgr, tx)?;
        }
        if let Some(si) = self.table_stats.get(tblname) {
            return Ok(*si);
        }
        let si = Self::calc_table_stats(table_info, tx)?;
        self.table_stats.insert(tblname.to_string(), si);
        Ok(si)
    }

    fn refresh_statistics(&mut self, table_mgr: &TableMgr, tx: &mut Transaction) -> Result<()> {
        self.table_stats.clear();
        self.num_calls = 0;
        debug!("refreshing catalog statistics");

        let tcat_info = table_mgr.get_table_info("tblcat", tx)?;
        let mut tcatfile = RecordFile::new(tx, tcat_info)?;
        let mut tblnames = Vec::new();
        while tcatfile.next()? {
            tblnames.push(tcatfile.get_string("tblname")?);
        }
        tcatfile.close()?;

        for tblname in tblnames {
            let table_info = table_mgr.get_table_info(&tblname, tx)?;
            let si = Self::calc_table_stats(&table_info, tx)?;
            self.table_stats.insert(tblname, si);
        }
        Ok(())
    }

    fn calc_table_stats(table_info: &TableInfo, tx: &mut Transaction) -> Result<StatInfo> {
        let mut num_recs = 0;
        let mut num_blocks = 0;
        let mut rf = RecordFile::new(tx, table_info.clone())?;
        while rf.next()? {
            num_recs += 1;
            num_blocks = rf.current_rid().block_number() + 1;
        }
        rf.close()?;
        Ok(StatInfo::new(num_blocks as usize, num_recs))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::{tempdir, TempDir};

    use crate::{
        buffer::manager::BufferManager, file::manager::FileManager, log::manager::LogManager,
        record::Schema, tx::concurrency::lock_table::LockTable,
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
    fn stats_reflect_inserted_records() {
        let (mut tx, _dir) = new_tx();
        let table_mgr = TableMgr::new(true, &mut tx).unwrap();

        let mut schema = Schema::new();
        schema.add_int_field("sid");
        table_mgr.create_table("students", &schema, &mut tx).unwrap();
        let ti = table_mgr.get_table_info("students", &mut tx).unwrap();

        {
            let mut rf = RecordFile::new(&mut tx, ti.clone()).unwrap();
            for _ in 0..5 {
                rf.insert().unwrap();
            }
            rf.close().unwrap();
        }

        let mut stat_mgr = StatMgr::new(&table_mgr, &mut tx).unwrap();
        let si = stat_mgr.get_stat_info("students", &ti, &table_mgr, &mut tx).unwrap();
        assert_eq!(si.records_output(), 5);
        assert!(si.blocks_accessed() >= 1);

        tx.commit().unwrap();
    }
}
