use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::Result,
    index::btree_index::BTreeIndex,
    record::{schema::FieldType, RecordFile, Schema, TableInfo},
    tx::transaction::Transaction,
};

use super::{
    stat_mgr::{StatInfo, StatMgr},
    table_mgr::{TableMgr, MAX_NAME},
};

/// Schema and cost-estimation metadata for one index, as recorded in `idxcat`. Holds
/// everything the query planner needs without keeping the defining transaction alive
/// (see "shared, reference-counted catalog metadata must not keep transactions alive").
#[derive(Debug, Clone)]
pub struct IndexInfo {
    idxname: String,
    fldname: String,
    leaf_schema: Schema,
    stat_info: StatInfo,
}

impl IndexInfo {
    pub fn new(idxname: &str, table_info: &TableInfo, fldname: &str, stat_info: StatInfo) -> Self {
        let leaf_schema = Self::build_schema(table_info, fldname);
        Self {
            idxname: idxname.to_string(),
            fldname: fldname.to_string(),
            leaf_schema,
            stat_info,
        }
    }

    /// `dataRid` (block, id) plus `dataval`, with `dataval`'s type/length taken from
    /// the indexed table's schema.
    fn build_schema(table_info: &TableInfo, fldname: &str) -> Schema {
        let mut schema = Schema::new();
        schema.add_int_field("block");
        schema.add_int_field("id");
        match table_info.schema().field_type(fldname) {
            FieldType::Integer => schema.add_int_field("dataval"),
            FieldType::Varchar => {
                let fldlen = table_info.schema().length(fldname);
                schema.add_string_field("dataval", fldlen);
            }
        }
        schema
    }

    pub fn open<'a>(&self, tx: &'a mut Transaction) -> Result<BTreeIndex<'a>> {
        BTreeIndex::new(tx, &self.idxname, self.leaf_schema.clone())
    }

    pub fn blocks_accessed(&self, tx: &mut Transaction) -> Result<usize> {
        let idx_table_info = TableInfo::new("", self.leaf_schema.clone());
        let rpb = tx.block_size()? / idx_table_info.record_length();
        if rpb == 0 {
            return Ok(1);
        }
        let numblocks = self.stat_info.records_output() / rpb;
        Ok(BTreeIndex::search_cost(numblocks, rpb))
    }

    pub fn records_output(&self) -> usize {
        let distinct = self.stat_info.distinct_values(&self.fldname).max(1);
        self.stat_info.records_output() / distinct
    }

    pub fn distinct_values(&self, fname: &str) -> usize {
        if self.fldname == fname {
            1
        } else {
            self.stat_info.distinct_values(&self.fldname).min(self.records_output())
        }
    }
}

/// Bootstraps `idxcat` and records/retrieves index definitions through it.
pub struct IndexMgr {
    table_info: TableInfo,
}

impl IndexMgr {
    pub fn new(is_new: bool, table_mgr: &TableMgr, tx: &mut Transaction) -> Result<Self> {
        if is_new {
            let mut schema = Schema::new();
            schema.add_string_field("indexname", MAX_NAME);
            schema.add_string_field("tablename", MAX_NAME);
            schema.add_string_field("fieldname", MAX_NAME);
            debug!("bootstrapping idxcat");
            table_mgr.create_table("idxcat", &schema, tx)?;
        }
        let table_info = table_mgr.get_table_info("idxcat", tx)?;
        Ok(Self { table_info })
    }

    pub fn create_index(
        &self,
        idxname: &str,
        tblname: &str,
        fldname: &str,
        tx: &mut Transaction,
    ) -> Result<()> {
        let mut rf = RecordFile::new(tx, self.table_info.clone())?;
        rf.insert()?;
        rf.set_string("indexname", idxname)?;
        rf.set_string("tablename", tblname)?;
        rf.set_string("fieldname", fldname)?;
        rf.close()?;
        debug!(idxname, tblname, fldname, "created index");
        Ok(())
    }

    /// All indexes on `tblname`, keyed by the indexed field's name.
    pub fn get_index_info(
        &self,
        tblname: &str,
        table_mgr: &TableMgr,
        stat_mgr: &mut StatMgr,
        tx: &mut Transaction,
    ) -> Result<HashMap<String, IndexInfo>> {
        let mut rows = Vec::new();
        {
            let mut rf = RecordFile::new(tx, self.table_info.clone())?;
            while rf.next()? {
                if rf.get_string("tablename")? == tblname {
                    rows.push((rf.get_string("indexname")?, rf.get_string("fieldname")?));
                }
            }
            rf.close()?;
        }

        let mut result = HashMap::new();
        if rows.is_empty() {
            return Ok(result);
        }

        let table_info = table_mgr.get_table_info(tblname, tx)?;
        let stat_info = stat_mgr.get_stat_info(tblname, &table_info, table_mgr, tx)?;
        for (idxname, fldname) in rows {
            result.insert(
                fldname.clone(),
                IndexInfo::new(&idxname, &table_info, &fldname, stat_info),
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::{tempdir, TempDir};

    use crate::{
        buffer::manager::BufferManager, file::manager::FileManager,
        index::{Constant, Index},
        log::manager::LogManager, record::Rid, tx::concurrency::lock_table::LockTable,
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
    fn create_index_and_look_it_up_by_table() {
        let (mut tx, _dir) = new_tx();
        let table_mgr = TableMgr::new(true, &mut tx).unwrap();
        let index_mgr = IndexMgr::new(true, &table_mgr, &mut tx).unwrap();
        let mut stat_mgr = StatMgr::new(&table_mgr, &mut tx).unwrap();

        let mut schema = Schema::new();
        schema.add_int_field("sid");
        schema.add_string_field("sname", 10);
        table_mgr.create_table("students", &schema, &mut tx).unwrap();

        index_mgr.create_index("sidx", "students", "sid", &mut tx).unwrap();

        let infos = index_mgr
            .get_index_info("students", &table_mgr, &mut stat_mgr, &mut tx)
            .unwrap();
        assert!(infos.contains_key("sid"));

        let info = &infos["sid"];
        let mut idx = info.open(&mut tx).unwrap();
        idx.insert(&Constant::Int(7), Rid::new(0, 0)).unwrap();
        idx.before_first(&Constant::Int(7)).unwrap();
        assert!(idx.next().unwrap());
        assert_eq!(idx.get_data_rid().unwrap(), Rid::new(0, 0));
        idx.close().unwrap();

        tx.commit().unwrap();
    }
}
