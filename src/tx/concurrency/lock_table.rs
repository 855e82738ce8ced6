use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

use tracing::warn;

use crate::error::{DbError, Result};
use crate::file::block_id::BlockId;

const MAX_TIME: Duration = Duration::from_secs(10);

#[derive(Debug)]
enum Lock {
    Exclusive,
    Shared(usize),
}

/// The single lock table shared by every transaction's `ConcurrencyManager`. Blocks
/// on contention via a condvar and gives up with `LockAbort` after `timeout`.
#[derive(Debug, Clone)]
pub struct LockTable {
    state: Arc<(Mutex<HashMap<BlockId, Lock>>, Condvar)>,
    timeout: Duration,
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self::with_timeout(MAX_TIME)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            state: Arc::new((Mutex::new(HashMap::new()), Condvar::new())),
            timeout,
        }
    }

    /// Blocks while an exclusive lock is held on `block`, then grants a shared lock.
    pub fn slock(&self, block: &BlockId) -> Result<()> {
        let (lock, cvar) = &*self.state;
        let mut locks = lock.lock()?;

        loop {
            match locks.get(block) {
                Some(Lock::Exclusive) => {
                    let (new_locks, timeout) = cvar.wait_timeout(locks, self.timeout)?;
                    locks = new_locks;

                    if timeout.timed_out() {
                        warn!(?block, "slock timed out");
                        return Err(DbError::LockAbort);
                    }
                }
                Some(Lock::Shared(count)) => {
                    let new_count = *count + 1;
                    locks.insert(block.clone(), Lock::Shared(new_count));
                    return Ok(());
                }
                None => {
                    locks.insert(block.clone(), Lock::Shared(1));
                    return Ok(());
                }
            }
        }
    }

    /// Blocks while any lock (shared or exclusive) is held on `block` by anyone else,
    /// then grants an exclusive lock.
    pub fn xlock(&self, block: &BlockId) -> Result<()> {
        let (lock, cvar) = &*self.state;
        let mut locks = lock.lock()?;

        loop {
            match locks.get(block) {
                Some(Lock::Shared(count)) if *count > 1 => {
                    let (new_locks, timeout) = cvar.wait_timeout(locks, self.timeout)?;
                    locks = new_locks;

                    if timeout.timed_out() {
                        warn!(?block, "xlock timed out");
                        return Err(DbError::LockAbort);
                    }
                }
                _ => {
                    locks.insert(block.clone(), Lock::Exclusive);
                    return Ok(());
                }
            }
        }
    }

    /// Releases the caller's lock on `block`. Wakes waiters once the last lock on the
    /// block is gone.
    pub fn unlock(&self, block: &BlockId) -> Result<()> {
        let (lock, cvar) = &*self.state;
        let mut locks = lock.lock()?;

        match locks.get(block) {
            Some(Lock::Shared(count)) if *count > 1 => {
                let new_count = *count - 1;
                locks.insert(block.clone(), Lock::Shared(new_count));
            }
            _ => {
                locks.remove(block);
                cvar.notify_all();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::MutexGuard};

    use crate::file::block_id::BlockId;

    use super::{Lock, LockTable};

    #[test]
    fn test_slocks() {
        let lock_table = LockTable::new();
        let block = BlockId::new("test.tbl", 1);

        assert!(lock_table.slock(&block).is_ok());
        assert!(lock_table.slock(&block).is_ok());
        assert!(matches!(
            get_locks(&lock_table).get(&block),
            Some(Lock::Shared(2))
        ));

        assert!(lock_table.unlock(&block).is_ok());
        assert!(matches!(
            get_locks(&lock_table).get(&block),
            Some(Lock::Shared(1))
        ));

        assert!(lock_table.unlock(&block).is_ok());
        assert!(get_locks(&lock_table).get(&block).is_none());
    }

    #[test]
    fn test_xlock() {
        let lock_table = LockTable::new();
        let block = BlockId::new("test.tbl", 1);

        assert!(lock_table.xlock(&block).is_ok());
        assert!(matches!(
            get_locks(&lock_table).get(&block),
            Some(Lock::Exclusive)
        ));

        assert!(lock_table.unlock(&block).is_ok());
        assert!(get_locks(&lock_table).get(&block).is_none());
    }

    #[test]
    fn test_xlock_timeout() {
        let lock_table = LockTable::new();
        let block = BlockId::new("test.tbl", 1);

        assert!(lock_table.slock(&block).is_ok());
        assert!(lock_table.slock(&block).is_ok());

        assert!(lock_table.xlock(&block).is_err());
    }

    #[test]
    fn test_slock_timeout() {
        let lock_table = LockTable::new();
        let block = BlockId::new("test.tbl", 1);

        assert!(lock_table.xlock(&block).is_ok());

        assert!(lock_table.slock(&block).is_err());
    }

    fn get_locks(lock_table: &LockTable) -> MutexGuard<HashMap<BlockId, Lock>> {
        let (lock, _) = &*lock_table.state;
        lock.lock().unwrap()
    }
}
