use std::fmt;

use crate::{error::Result, file::block_id::BlockId, tx::transaction::Transaction};

use super::{record_page::RecordPage, table_info::TableInfo};

/// An identifier for a record within a file: the block it lives in, plus its slot
/// within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    block_number: u64,
    slot: i64,
}

impl Rid {
    pub fn new(block_number: u64, slot: i64) -> Self {
        Self { block_number, slot }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn slot(&self) -> i64 {
        self.slot
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.block_number, self.slot)
    }
}

/// A scan over a table's records: holds the transaction exclusively for the
/// duration of the scan, moving a `RecordPage` block-by-block across the file.
pub struct RecordFile<'a> {
    tx: &'a mut Transaction,
    table_info: TableInfo,
    filename: String,
    record_page: RecordPage,
    current_blknum: u64,
}

impl<'a> RecordFile<'a> {
    /// Opens the table's file, creating its first (empty) block if the file is new.
    pub fn new(tx: &'a mut Transaction, table_info: TableInfo) -> Result<Self> {
        let filename = table_info.file_name();
        if tx.size(&filename)? == 0 {
            Self::append_block(tx, &filename, &table_info)?;
        }
        let record_page = Self::open_block(tx, &filename, 0, table_info.clone())?;

        Ok(Self {
            tx,
            table_info,
            filename,
            record_page,
            current_blknum: 0,
        })
    }

    pub fn close(&mut self) -> Result<()> {
        self.record_page.close(self.tx)
    }

    pub fn before_first(&mut self) -> Result<()> {
        self.move_to(0)
    }

    /// Advances to the next record, crossing into later blocks as needed. Returns
    /// `false` once the last block's last record has been passed.
    pub fn next(&mut self) -> Result<bool> {
        loop {
            if self.record_page.next(self.tx)? {
                return Ok(true);
            }
            if self.at_last_block()? {
                return Ok(false);
            }
            self.move_to(self.current_blknum + 1)?;
        }
    }

    pub fn get_int(&mut self, fldname: &str) -> Result<i32> {
        self.record_page.get_int(self.tx, fldname)
    }

    pub fn get_string(&mut self, fldname: &str) -> Result<String> {
        self.record_page.get_string(self.tx, fldname)
    }

    pub fn set_int(&mut self, fldname: &str, val: i32) -> Result<()> {
        self.record_page.set_int(self.tx, fldname, val)
    }

    pub fn set_string(&mut self, fldname: &str, val: &str) -> Result<()> {
        self.record_page.set_string(self.tx, fldname, val)
    }

    pub fn delete(&mut self) -> Result<()> {
        self.record_page.delete(self.tx)
    }

    /// Inserts a blank record starting at the current position, appending a new
    /// block to the file if none of the existing ones have a free slot.
    pub fn insert(&mut self) -> Result<()> {
        while !self.record_page.insert(self.tx)? {
            if self.at_last_block()? {
                Self::append_block(self.tx, &self.filename, &self.table_info)?;
            }
            self.move_to(self.current_blknum + 1)?;
        }
        Ok(())
    }

    pub fn move_to_rid(&mut self, rid: Rid) -> Result<()> {
        self.move_to(rid.block_number())?;
        self.record_page.move_to_id(rid.slot());
        Ok(())
    }

    pub fn current_rid(&self) -> Rid {
        Rid::new(self.current_blknum, self.record_page.current_id())
    }

    fn move_to(&mut self, blknum: u64) -> Result<()> {
        self.record_page.close(self.tx)?;
        self.current_blknum = blknum;
        self.record_page = Self::open_block(self.tx, &self.filename, blknum, self.table_info.clone())?;
        Ok(())
    }

    fn at_last_block(&mut self) -> Result<bool> {
        Ok(self.current_blknum == self.tx.size(&self.filename)? as u64 - 1)
    }

    fn append_block(tx: &mut Transaction, filename: &str, table_info: &TableInfo) -> Result<()> {
        let block = tx.append(filename)?;
        RecordPage::format(tx, &block, table_info)
    }

    fn open_block(
        tx: &mut Transaction,
        filename: &str,
        blknum: u64,
        table_info: TableInfo,
    ) -> Result<RecordPage> {
        let block = BlockId::new(filename, blknum);
        RecordPage::new(tx, block, table_info)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::tempdir;

    use crate::{
        buffer::manager::BufferManager, file::manager::FileManager, log::manager::LogManager,
        record::schema::Schema, tx::concurrency::lock_table::LockTable, tx::transaction::Transaction,
    };

    use super::*;

    fn new_tx(
        file_manager: &Arc<Mutex<FileManager>>,
        log_manager: &Arc<Mutex<LogManager>>,
        buffer_manager: &Arc<Mutex<BufferManager>>,
        lock_table: &Arc<Mutex<LockTable>>,
    ) -> Transaction {
        Transaction::new(
            Arc::clone(file_manager),
            Arc::clone(log_manager),
            Arc::clone(buffer_manager),
            Arc::clone(lock_table),
        )
        .unwrap()
    }

    fn student_table_info() -> TableInfo {
        let mut schema = Schema::new();
        schema.add_int_field("sid");
        schema.add_string_field("sname", 10);
        schema.add_int_field("gradyear");
        TableInfo::new("students", schema)
    }

    #[test]
    fn insert_scan_and_delete_round_trip() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let log_file = temp_dir.path().join("simpledb.log").to_str().unwrap().to_string();
        let block_size = 400;

        let file_manager = Arc::new(Mutex::new(FileManager::new(db_dir, block_size).unwrap()));
        let log_manager = Arc::new(Mutex::new(
            LogManager::new(Arc::clone(&file_manager), &log_file).unwrap(),
        ));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            8,
        )));
        let lock_table = Arc::new(Mutex::new(LockTable::new()));

        let mut tx = new_tx(&file_manager, &log_manager, &buffer_manager, &lock_table);

        {
            let mut rf = RecordFile::new(&mut tx, student_table_info()).unwrap();
            for i in 0..20 {
                rf.insert().unwrap();
                rf.set_int("sid", i).unwrap();
                rf.set_string("sname", &format!("student{i}")).unwrap();
                rf.set_int("gradyear", 2020 + (i % 4)).unwrap();
            }

            let mut count = 0;
            let mut deleted = 0;
            rf.before_first().unwrap();
            while rf.next().unwrap() {
                let sid = rf.get_int("sid").unwrap();
                if sid % 2 == 0 {
                    rf.delete().unwrap();
                    deleted += 1;
                } else {
                    count += 1;
                }
            }
            assert_eq!(deleted, 10);
            assert_eq!(count, 10);

            let mut remaining = 0;
            rf.before_first().unwrap();
            while rf.next().unwrap() {
                let sid = rf.get_int("sid").unwrap();
                assert_eq!(sid % 2, 1);
                remaining += 1;
            }
            assert_eq!(remaining, 10);

            rf.close().unwrap();
        }

        tx.commit().unwrap();
    }

    #[test]
    fn move_to_rid_revisits_a_record() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let log_file = temp_dir.path().join("simpledb.log").to_str().unwrap().to_string();
        let block_size = 400;

        let file_manager = Arc::new(Mutex::new(FileManager::new(db_dir, block_size).unwrap()));
        let log_manager = Arc::new(Mutex::new(
            LogManager::new(Arc::clone(&file_manager), &log_file).unwrap(),
        ));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            8,
        )));
        let lock_table = Arc::new(Mutex::new(LockTable::new()));

        let mut tx = new_tx(&file_manager, &log_manager, &buffer_manager, &lock_table);

        let mut rf = RecordFile::new(&mut tx, student_table_info()).unwrap();
        rf.insert().unwrap();
        rf.set_int("sid", 42).unwrap();
        let rid = rf.current_rid();

        rf.insert().unwrap();
        rf.set_int("sid", 43).unwrap();

        rf.move_to_rid(rid).unwrap();
        assert_eq!(rf.get_int("sid").unwrap(), 42);

        rf.close().unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn set_string_rejects_a_value_longer_than_the_field() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let log_file = temp_dir.path().join("simpledb.log").to_str().unwrap().to_string();
        let block_size = 400;

        let file_manager = Arc::new(Mutex::new(FileManager::new(db_dir, block_size).unwrap()));
        let log_manager = Arc::new(Mutex::new(
            LogManager::new(Arc::clone(&file_manager), &log_file).unwrap(),
        ));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            8,
        )));
        let lock_table = Arc::new(Mutex::new(LockTable::new()));

        let mut tx = new_tx(&file_manager, &log_manager, &buffer_manager, &lock_table);

        let mut rf = RecordFile::new(&mut tx, student_table_info()).unwrap();
        rf.insert().unwrap();
        // "sname" is VARCHAR(10); this value is 11 characters.
        assert!(rf.set_string("sname", "eleven-char").is_err());
        rf.close().unwrap();
        tx.commit().unwrap();
    }
}
