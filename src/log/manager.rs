use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::{
    error::Result,
    file::{block_id::BlockId, manager::FileManager, page::Page},
    Lsn,
};

use super::iterator::LogIterator;

/// Writes log records to the log file from right to left within each block.
///
/// A log sequence number (LSN) identifies a log record; this manager tracks the next
/// available LSN and the LSN of the most recently flushed record.
#[derive(Debug)]
pub struct LogManager {
    file_manager: Arc<Mutex<FileManager>>,
    logfile: String,
    logpage: Page,
    current_block: BlockId,
    latest_lsn: Lsn,
    last_saved_lsn: Lsn,
}

impl LogManager {
    pub fn new(file_manager: Arc<Mutex<FileManager>>, log_file: &str) -> Result<Self> {
        let block_size = file_manager.lock()?.block_size();

        let mut log_manager = LogManager {
            file_manager: Arc::clone(&file_manager),
            logfile: log_file.to_string(),
            logpage: Page::from_bytes(vec![0; block_size]),
            current_block: BlockId::new(log_file, 0),
            latest_lsn: 0,
            last_saved_lsn: 0,
        };

        let log_size = file_manager.lock()?.length(log_file)?;
        log_manager.current_block = if log_size == 0 {
            log_manager.append_new_block()?
        } else {
            let block = BlockId::new(log_file, (log_size - 1) as u64);
            file_manager.lock()?.read(&block, &mut log_manager.logpage)?;
            block
        };

        Ok(log_manager)
    }

    /// Ensures the log record with the given LSN, and every record before it, is on disk.
    pub fn flush(&mut self, lsn: Lsn) -> Result<()> {
        if lsn >= self.last_saved_lsn {
            self.do_flush()?;
        }

        Ok(())
    }

    /// Flushes outstanding records, then returns an iterator over them newest-first.
    pub fn iterator(&mut self) -> Result<LogIterator> {
        self.do_flush()?;
        LogIterator::new(Arc::clone(&self.file_manager), &self.current_block)
    }

    /// Appends a record to the page right-to-left. The first 4 bytes of the page hold
    /// the offset of the most recently added record, so the iterator knows where the
    /// chain of records begins.
    pub fn append(&mut self, logrec: &[u8]) -> Result<Lsn> {
        let mut boundary = self.logpage.get_int(0)?;
        let int_bytes = std::mem::size_of::<i32>() as i32;
        let recsize = logrec.len() as i32;
        let bytes_needed = recsize + int_bytes;

        if boundary - bytes_needed < int_bytes {
            self.do_flush()?;
            self.current_block = self.append_new_block()?;
            boundary = self.logpage.get_int(0)?;
        }

        let recpos = boundary - bytes_needed;
        self.logpage.set_bytes(recpos as usize, logrec)?;
        self.logpage.set_int(0, recpos)?;
        self.latest_lsn += 1;
        trace!(lsn = self.latest_lsn, size = recsize, "appended log record");
        Ok(self.latest_lsn)
    }

    fn do_flush(&mut self) -> Result<()> {
        self.file_manager
            .lock()?
            .write(&self.current_block, &mut self.logpage)?;

        self.last_saved_lsn = self.latest_lsn;

        Ok(())
    }

    fn append_new_block(&mut self) -> Result<BlockId> {
        let mut guard = self.file_manager.lock()?;
        let block = guard.append(&self.logfile)?;
        self.logpage.set_int(0, guard.block_size() as i32)?;
        guard.write(&block, &mut self.logpage)?;
        Ok(block)
    }
}
