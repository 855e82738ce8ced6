use std::{
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

use tracing::{trace, warn};

use crate::{
    error::{DbError, Result},
    file::{block_id::BlockId, manager::FileManager},
    log::manager::LogManager,
};

use super::buffer::Buffer;

const MAX_TIME: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct BufferPoolState {
    pub buffer_pool: Vec<Buffer>,
    num_available: usize,
}

/// The shared pool of buffer slots, guarded by a mutex/condvar pair: `pin` blocks until
/// a buffer is available or `MAX_TIME` elapses, `unpin` wakes any waiters.
#[derive(Debug)]
pub struct BufferManager {
    pub state: Arc<(Mutex<BufferPoolState>, Condvar)>,
    timeout: Duration,
}

impl BufferManager {
    pub fn new(
        file_manager: Arc<Mutex<FileManager>>,
        log_manager: Arc<Mutex<LogManager>>,
        num_buffers: usize,
    ) -> Self {
        Self::with_timeout(file_manager, log_manager, num_buffers, MAX_TIME)
    }

    pub fn with_timeout(
        file_manager: Arc<Mutex<FileManager>>,
        log_manager: Arc<Mutex<LogManager>>,
        num_buffers: usize,
        timeout: Duration,
    ) -> Self {
        let buffers = (0..num_buffers)
            .map(|_| Buffer::new(Arc::clone(&file_manager), Arc::clone(&log_manager)))
            .collect();

        let state = BufferPoolState {
            buffer_pool: buffers,
            num_available: num_buffers,
        };

        Self {
            state: Arc::new((Mutex::new(state), Condvar::new())),
            timeout,
        }
    }

    pub fn available(&self) -> Result<usize> {
        let (lock, _) = &*self.state;
        let state = lock.lock()?;
        Ok(state.num_available)
    }

    pub fn unpin(&self, idx: usize) -> Result<()> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock()?;

        state.buffer_pool[idx].unpin();
        if !state.buffer_pool[idx].is_pinned() {
            state.num_available += 1;
            cvar.notify_all();
        }
        Ok(())
    }

    pub fn pin(&self, block: &BlockId) -> Result<usize> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock()?;

        loop {
            if let Some(idx) = self.try_to_pin(block, &mut state)? {
                return Ok(idx);
            }

            let (new_state, timeout) = cvar.wait_timeout(state, self.timeout)?;
            state = new_state;

            if timeout.timed_out() {
                warn!(?block, "buffer pin timed out");
                return Err(DbError::BufferAbort);
            }
        }
    }

    pub fn flush_all(&self, txnum: i64) -> Result<()> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock()?;

        let result = state
            .buffer_pool
            .iter_mut()
            .filter(|buf| buf.txnum == txnum)
            .try_for_each(|buf| buf.flush());

        cvar.notify_all();
        result
    }

    fn try_to_pin(
        &self,
        block: &BlockId,
        state: &mut BufferPoolState,
    ) -> Result<Option<usize>> {
        if let Some(idx) = self.find_existing_buffer(block, state) {
            if !state.buffer_pool[idx].is_pinned() {
                state.num_available -= 1;
            }
            state.buffer_pool[idx].pin();
            trace!(?block, idx, "pinned existing buffer");
            return Ok(Some(idx));
        }

        if let Some(idx) = self.find_unpinned_buffer(state) {
            state.buffer_pool[idx].assign_to_block(block)?;
            state.num_available -= 1;
            state.buffer_pool[idx].pin();
            trace!(?block, idx, "pinned replacement buffer");
            return Ok(Some(idx));
        }

        Ok(None)
    }

    fn find_existing_buffer(&self, block: &BlockId, state: &BufferPoolState) -> Option<usize> {
        state
            .buffer_pool
            .iter()
            .enumerate()
            .find(|(_, buffer)| buffer.block() == Some(block))
            .map(|(idx, _)| idx)
    }

    fn find_unpinned_buffer(&self, state: &BufferPoolState) -> Option<usize> {
        state
            .buffer_pool
            .iter()
            .enumerate()
            .find(|(_, buffer)| !buffer.is_pinned())
            .map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use tempfile::tempdir;

    use crate::{
        buffer::manager::BufferManager,
        file::{block_id::BlockId, manager::FileManager},
        log::manager::LogManager,
    };

    #[test]
    fn test_buffer_manager() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let test_file = temp_dir
            .path()
            .join("simpledb.log")
            .to_str()
            .unwrap()
            .to_string();

        let block_size = 400;
        let num_buffers = 3;

        let file_manager = Arc::new(Mutex::new(FileManager::new(db_dir, block_size).unwrap()));
        let log_manager = Arc::new(Mutex::new(
            LogManager::new(Arc::clone(&file_manager), &test_file).unwrap(),
        ));
        let buffer_manager = BufferManager::new(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            num_buffers,
        );

        let mut buffers = vec![0usize; 6];
        buffers[0] = buffer_manager.pin(&BlockId::new("testfile", 0)).unwrap();
        buffers[1] = buffer_manager.pin(&BlockId::new("testfile", 1)).unwrap();
        buffers[2] = buffer_manager.pin(&BlockId::new("testfile", 2)).unwrap();

        buffer_manager.unpin(buffers[1]).unwrap();
        buffers[1] = 42;

        buffers[3] = buffer_manager.pin(&BlockId::new("testfile", 0)).unwrap(); // block 0 pinned twice
        buffers[4] = buffer_manager.pin(&BlockId::new("testfile", 1)).unwrap(); // block 1 repinned
        assert_eq!(0, buffer_manager.available().unwrap());

        assert!(buffer_manager.pin(&BlockId::new("testfile", 3)).is_err()); // no buffers left

        buffer_manager.unpin(buffers[2]).unwrap();
        buffers[2] = 42;

        buffers[5] = buffer_manager.pin(&BlockId::new("testfile", 3)).unwrap(); // now this works

        let expected = HashMap::from([
            (0, BlockId::new("testfile", 0)),
            (3, BlockId::new("testfile", 0)),
            (4, BlockId::new("testfile", 1)),
            (5, BlockId::new("testfile", 3)),
        ]);

        let (lock, _) = &*buffer_manager.state;
        let state = lock.lock().unwrap();

        for (i, &idx) in buffers.iter().enumerate() {
            if idx != 42 {
                let actual = state.buffer_pool[idx].block();
                assert_eq!(expected.get(&i).unwrap(), actual.unwrap());
            } else {
                assert!(i == 1 || i == 2);
            }
        }
    }
}
