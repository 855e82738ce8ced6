use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{
    buffer::{buffer::Buffer, manager::BufferManager},
    error::{DbError, Result},
    log::manager::LogManager,
    tx::transaction::Transaction,
    Lsn,
};

use super::log_record::{
    create_log_record, CheckpointRecord, CommitRecord, LogOperation, RollbackRecord, SetIntRecord,
    SetStringRecord, StartRecord,
};

/// Each transaction owns one of these. It writes the transaction's log records and,
/// on rollback or crash recovery, undoes them in reverse order.
#[derive(Debug, Clone)]
pub struct RecoveryManager {
    log_manager: Arc<Mutex<LogManager>>,
    buffer_manager: Arc<Mutex<BufferManager>>,
    txnum: Lsn,
}

impl RecoveryManager {
    pub fn new(
        log_manager: Arc<Mutex<LogManager>>,
        buffer_manager: Arc<Mutex<BufferManager>>,
        txnum: Lsn,
    ) -> Result<Self> {
        StartRecord::write_to_log(Arc::clone(&log_manager), txnum)?;
        Ok(Self {
            log_manager,
            buffer_manager,
            txnum,
        })
    }

    /// Writes and flushes a commit record, after flushing the transaction's buffers.
    pub fn commit(&self) -> Result<()> {
        self.buffer_manager.lock()?.flush_all(self.txnum)?;
        let lsn = CommitRecord::write_to_log(Arc::clone(&self.log_manager), self.txnum)?;
        self.log_manager.lock()?.flush(lsn)?;
        Ok(())
    }

    /// Undoes the transaction's updates, then writes and flushes a rollback record.
    pub fn rollback(&self, tx: &mut Transaction) -> Result<()> {
        self.do_rollback(tx)?;
        self.buffer_manager.lock()?.flush_all(self.txnum)?;
        let lsn = RollbackRecord::write_to_log(Arc::clone(&self.log_manager), self.txnum)?;
        self.log_manager.lock()?.flush(lsn)?;
        Ok(())
    }

    /// Undoes every uncommitted transaction found in the log, then writes a
    /// quiescent checkpoint record. Called once at startup, before user
    /// transactions begin.
    pub fn recover(&self, tx: &mut Transaction) -> Result<()> {
        self.do_recover(tx)?;
        self.buffer_manager.lock()?.flush_all(self.txnum)?;
        let lsn = CheckpointRecord::write_to_log(Arc::clone(&self.log_manager))?;
        self.log_manager.lock()?.flush(lsn)?;
        Ok(())
    }

    /// Writes a SETINT record capturing the value currently at `offset`, before the
    /// caller overwrites it, so undo can restore it later.
    pub fn set_int(&self, buf: &mut Buffer, offset: usize, _new_val: i32) -> Result<Lsn> {
        let old_val = buf.contents.get_int(offset)?;
        if let Some(block) = buf.block() {
            return SetIntRecord::write_to_log(
                Arc::clone(&self.log_manager),
                self.txnum,
                block,
                offset,
                old_val,
            );
        }
        Err(DbError::ProgrammerError(
            "set_int logged against an unassigned buffer".into(),
        ))
    }

    /// Writes a SETSTRING record capturing the value currently at `offset`.
    pub fn set_string(&self, buf: &mut Buffer, offset: usize, _new_val: &str) -> Result<Lsn> {
        let old_val = buf.contents.get_string(offset)?;
        if let Some(block) = buf.block() {
            return SetStringRecord::write_to_log(
                Arc::clone(&self.log_manager),
                self.txnum,
                block,
                offset,
                &old_val,
            );
        }
        Err(DbError::ProgrammerError(
            "set_string logged against an unassigned buffer".into(),
        ))
    }

    /// Walks the log from the most recent record back to this transaction's START
    /// record, undoing each of its updates along the way.
    fn do_rollback(&self, tx: &mut Transaction) -> Result<()> {
        let mut iter = self.log_manager.lock()?.iterator()?;
        while iter.has_next() {
            if let Some(bytes) = iter.next() {
                let rec = create_log_record(bytes)?;
                if rec.tx_number() == self.txnum {
                    if rec.op() == LogOperation::Start {
                        return Ok(());
                    }

                    rec.undo(tx)?;
                }
            }
        }

        Ok(())
    }

    /// Undoes every log record belonging to a transaction that neither committed
    /// nor rolled back, stopping at a CHECKPOINT record or the start of the log.
    fn do_recover(&self, tx: &mut Transaction) -> Result<()> {
        let mut finished_txs = vec![];
        let mut iter = self.log_manager.lock()?.iterator()?;
        while iter.has_next() {
            if let Some(bytes) = iter.next() {
                let rec = create_log_record(bytes)?;
                match rec.op() {
                    LogOperation::Checkpoint => {
                        debug!("recovery stopped at checkpoint");
                        return Ok(());
                    }
                    LogOperation::Commit | LogOperation::Rollback => {
                        finished_txs.push(rec.tx_number())
                    }
                    _ => {
                        if !finished_txs.contains(&rec.tx_number()) {
                            rec.undo(tx)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
