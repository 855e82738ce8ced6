use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::error::Result;
use crate::file::block_id::BlockId;

use super::lock_table::LockTable;

#[derive(Debug, PartialEq, Eq)]
enum Lock {
    Exclusive,
    Shared,
}

/// Each transaction has its own concurrency manager, tracking which locks the
/// transaction currently holds and acquiring new ones from the shared `LockTable` as
/// needed. Enforces strict two-phase locking: shared before read, exclusive before
/// write, everything released together at commit or rollback.
#[derive(Debug)]
pub struct ConcurrencyManager {
    lock_table: Arc<Mutex<LockTable>>,
    locks: HashMap<BlockId, Lock>,
}

impl ConcurrencyManager {
    pub fn new(lock_table: Arc<Mutex<LockTable>>) -> Self {
        Self {
            lock_table,
            locks: HashMap::new(),
        }
    }

    pub fn slock(&mut self, block: &BlockId) -> Result<()> {
        match self.locks.get(block) {
            Some(Lock::Exclusive) | Some(Lock::Shared) => Ok(()),
            None => {
                self.lock_table.lock()?.slock(block)?;
                self.locks.insert(block.clone(), Lock::Shared);
                Ok(())
            }
        }
    }

    pub fn xlock(&mut self, block: &BlockId) -> Result<()> {
        match self.locks.get(block) {
            Some(Lock::Exclusive) => Ok(()),
            _ => {
                self.slock(block)?;
                self.lock_table.lock()?.xlock(block)?;
                self.locks.insert(block.clone(), Lock::Exclusive);
                Ok(())
            }
        }
    }

    pub fn release(&mut self) -> Result<()> {
        for block in self.locks.keys() {
            self.lock_table.lock()?.unlock(block)?;
        }
        self.locks.clear();
        Ok(())
    }
}
