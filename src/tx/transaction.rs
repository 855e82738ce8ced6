use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc, Mutex,
};

use tracing::debug;

use crate::{
    buffer::manager::BufferManager,
    error::{DbError, Result},
    file::{block_id::BlockId, manager::FileManager},
    Lsn,
};

use super::{
    bufferlist::BufferList,
    concurrency::{lock_table::LockTable, manager::ConcurrencyManager},
    recovery::manager::RecoveryManager,
};

static NEXT_TX_NUM: AtomicI64 = AtomicI64::new(0);

/// Transaction management for clients: ensures every transaction is serializable,
/// recoverable, and in general satisfies the ACID properties, by coordinating a
/// private `RecoveryManager` and `ConcurrencyManager` plus the shared buffer pool.
#[derive(Debug)]
pub struct Transaction {
    recovery_manager: RecoveryManager,
    concurrency_manager: ConcurrencyManager,
    buffer_manager: Arc<Mutex<BufferManager>>,
    file_manager: Arc<Mutex<FileManager>>,
    buffers: BufferList,
    txnum: Lsn,
}

impl Transaction {
    pub fn new(
        file_manager: Arc<Mutex<FileManager>>,
        log_manager: Arc<Mutex<crate::log::manager::LogManager>>,
        buffer_manager: Arc<Mutex<BufferManager>>,
        lock_table: Arc<Mutex<LockTable>>,
    ) -> Result<Self> {
        let txnum = NEXT_TX_NUM.fetch_add(1, Ordering::SeqCst);
        let recovery_manager = RecoveryManager::new(
            Arc::clone(&log_manager),
            Arc::clone(&buffer_manager),
            txnum,
        )?;
        let concurrency_manager = ConcurrencyManager::new(Arc::clone(&lock_table));
        let tx_buffers = BufferList::new(Arc::clone(&buffer_manager));

        debug!(txnum, "started transaction");

        Ok(Self {
            recovery_manager,
            concurrency_manager,
            buffer_manager,
            file_manager,
            buffers: tx_buffers,
            txnum,
        })
    }

    pub fn tx_number(&self) -> Lsn {
        self.txnum
    }

    /// Flushes all modified buffers (and their log records), writes and flushes a
    /// commit record, releases all locks, and unpins any pinned buffers.
    pub fn commit(&mut self) -> Result<()> {
        self.recovery_manager.commit()?;
        self.concurrency_manager.release()?;
        self.buffers.unpin_all()?;
        debug!(txnum = self.txnum, "committed transaction");
        Ok(())
    }

    /// Undoes any modified values, flushes those buffers, writes and flushes a
    /// rollback record, releases all locks, and unpins any pinned buffers.
    pub fn rollback(&mut self) -> Result<()> {
        let recovery_manager = self.recovery_manager.clone();
        recovery_manager.rollback(self)?;
        self.concurrency_manager.release()?;
        self.buffers.unpin_all()?;
        debug!(txnum = self.txnum, "rolled back transaction");
        Ok(())
    }

    /// Flushes all modified buffers, rolls back every uncompleted transaction found
    /// in the log, and writes a quiescent checkpoint record. Called during system
    /// startup, before user transactions begin.
    pub fn recover(&mut self) -> Result<()> {
        self.buffer_manager.lock()?.flush_all(self.txnum)?;
        let recovery_manager = self.recovery_manager.clone();
        recovery_manager.recover(self)?;
        Ok(())
    }

    pub fn pin(&mut self, block: &BlockId) -> Result<()> {
        self.buffers.pin(block)
    }

    pub fn unpin(&mut self, block: &BlockId) -> Result<()> {
        self.buffers.unpin(block)
    }

    /// Returns the integer at `offset` in `block`, after acquiring a shared lock.
    pub fn get_int(&mut self, block: &BlockId, offset: usize) -> Result<i32> {
        self.concurrency_manager.slock(block)?;

        let idx = self.buffers.get_buffer_idx(block).ok_or_else(|| {
            DbError::ProgrammerError(format!("block {} is not pinned by this transaction", block))
        })?;
        let (lock, _) = &*self.buffer_manager.lock()?.state;
        let mut state = lock.lock()?;
        state.buffer_pool[idx].contents.get_int(offset)
    }

    /// Returns the string at `offset` in `block`, after acquiring a shared lock.
    pub fn get_string(&mut self, block: &BlockId, offset: usize) -> Result<String> {
        self.concurrency_manager.slock(block)?;

        let idx = self.buffers.get_buffer_idx(block).ok_or_else(|| {
            DbError::ProgrammerError(format!("block {} is not pinned by this transaction", block))
        })?;
        let (lock, _) = &*self.buffer_manager.lock()?.state;
        let mut state = lock.lock()?;
        state.buffer_pool[idx].contents.get_string(offset)
    }

    /// Stores an integer at `offset` in `block`, after acquiring an exclusive lock.
    /// When `ok_to_log` is set, first writes an update log record holding the value
    /// being overwritten, so it can later be undone.
    pub fn set_int(
        &mut self,
        block: &BlockId,
        offset: usize,
        val: i32,
        ok_to_log: bool,
    ) -> Result<()> {
        self.concurrency_manager.xlock(block)?;

        let idx = self.buffers.get_buffer_idx(block).ok_or_else(|| {
            DbError::ProgrammerError(format!("block {} is not pinned by this transaction", block))
        })?;
        let (lock, _) = &*self.buffer_manager.lock()?.state;
        let mut state = lock.lock()?;
        let mut lsn = -1;
        if ok_to_log {
            lsn = self
                .recovery_manager
                .set_int(&mut state.buffer_pool[idx], offset, val)?;
        }

        state.buffer_pool[idx].contents.set_int(offset, val)?;
        state.buffer_pool[idx].set_modified(self.txnum, lsn);
        Ok(())
    }

    /// Stores a string at `offset` in `block`, after acquiring an exclusive lock. See
    /// `set_int` for the logging behavior. `max_bytes`, when given, is the field's
    /// reserved capacity (length prefix included): the write fails with
    /// `InvalidValue` rather than overflowing into whatever follows it in the block.
    /// Pass `None` only to restore a value that was already written once (an undo),
    /// since by construction it already fit.
    pub fn set_string(
        &mut self,
        block: &BlockId,
        offset: usize,
        val: &str,
        max_bytes: Option<usize>,
        ok_to_log: bool,
    ) -> Result<()> {
        self.concurrency_manager.xlock(block)?;

        let idx = self.buffers.get_buffer_idx(block).ok_or_else(|| {
            DbError::ProgrammerError(format!("block {} is not pinned by this transaction", block))
        })?;
        let (lock, _) = &*self.buffer_manager.lock()?.state;
        let mut state = lock.lock()?;
        let mut lsn = -1;
        if ok_to_log {
            lsn = self
                .recovery_manager
                .set_string(&mut state.buffer_pool[idx], offset, val)?;
        }

        match max_bytes {
            Some(max) => state.buffer_pool[idx].contents.set_string_checked(offset, val, max)?,
            None => state.buffer_pool[idx].contents.set_string(offset, val)?,
        }
        state.buffer_pool[idx].set_modified(self.txnum, lsn);
        Ok(())
    }

    /// Returns the number of blocks in `filename`, after acquiring a shared lock on
    /// the "end of file" sentinel (phantom prevention for scans that include the
    /// file's length).
    pub fn size(&mut self, filename: &str) -> Result<usize> {
        let dummy_block = BlockId::end_of_file(filename);
        self.concurrency_manager.slock(&dummy_block)?;
        self.file_manager.lock()?.length(filename)
    }

    /// Appends a new block to `filename` and returns it, after acquiring an
    /// exclusive lock on the "end of file" sentinel.
    pub fn append(&mut self, filename: &str) -> Result<BlockId> {
        let dummy_block = BlockId::end_of_file(filename);
        self.concurrency_manager.xlock(&dummy_block)?;
        self.file_manager.lock()?.append(filename)
    }

    pub fn block_size(&self) -> Result<usize> {
        Ok(self.file_manager.lock()?.block_size())
    }

    pub fn available_buffs(&self) -> Result<usize> {
        self.buffer_manager.lock()?.available()
    }
}
