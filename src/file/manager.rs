use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use tracing::{debug, info};

use crate::error::Result;

use super::{block_id::BlockId, page::Page};

/// Owns the open file handles for a database directory and performs all block-level
/// reads, writes, and appends. One `FileManager` per `SimpleDb` instance.
#[derive(Debug)]
pub struct FileManager {
    db_dir: String,
    block_size: usize,
    is_new: bool,
    open_files: HashMap<String, Arc<Mutex<File>>>,
    total_blocks_read: usize,
    total_blocks_write: usize,
}

impl FileManager {
    pub fn new(db_dir: &str, block_size: usize) -> Result<Self> {
        let path = Path::new(db_dir);
        let is_new = !path.exists();

        if is_new {
            info!(dir = db_dir, "creating new database directory");
            std::fs::create_dir_all(path)?;
        }

        // Remove any leftover temporary tables from a prior run (sorting/materialization
        // scratch files, never the caller's own tables).
        for entry in std::fs::read_dir(path)? {
            let entry_path = entry?.path();
            let is_temp = entry_path.is_file()
                && entry_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("temp"));
            if is_temp {
                debug!(file = ?entry_path, "removing leftover temp file");
                std::fs::remove_file(&entry_path)?;
            }
        }

        Ok(Self {
            db_dir: db_dir.to_string(),
            block_size,
            is_new,
            open_files: HashMap::new(),
            total_blocks_read: 0,
            total_blocks_write: 0,
        })
    }

    pub fn read(&mut self, block: &BlockId, page: &mut Page) -> Result<()> {
        let file = self.get_file(block.filename())?;
        let mut guard = file.lock()?;
        let pos = (block.block_number() as usize * self.block_size) as u64;

        page.clear();
        guard.seek(SeekFrom::Start(pos))?;

        if guard.metadata()?.len() >= pos + self.block_size as u64 {
            let mut temp_buf = vec![0u8; self.block_size];
            guard.read_exact(&mut temp_buf)?;
            let contents = page.contents();
            contents.clear();
            contents.write_bytes(&temp_buf);
        }

        self.total_blocks_read += 1;

        Ok(())
    }

    pub fn write(&mut self, block: &BlockId, page: &mut Page) -> Result<()> {
        let file = self.get_file(block.filename())?;
        let mut guard = file.lock()?;
        guard.seek(SeekFrom::Start(
            (block.block_number() as usize * self.block_size) as u64,
        ))?;
        guard.write_all(page.contents().as_bytes())?;
        guard.sync_all()?;

        self.total_blocks_write += 1;

        Ok(())
    }

    pub fn append(&mut self, filename: &str) -> Result<BlockId> {
        let new_block_number = self.length(filename)? as u64;
        let block = BlockId::new(filename, new_block_number);
        let bytes = vec![0u8; self.block_size];

        let file = self.get_file(block.filename())?;
        let mut guard = file.lock()?;
        guard.seek(SeekFrom::Start(
            (block.block_number() as usize * self.block_size) as u64,
        ))?;
        guard.write_all(&bytes)?;
        guard.sync_all()?;

        self.total_blocks_write += 1;

        Ok(block)
    }

    pub fn length(&mut self, filename: &str) -> Result<usize> {
        let file = self.get_file(filename)?;
        let guard = file.lock()?;
        let len = guard.metadata()?.len();

        Ok((len as usize + self.block_size - 1) / self.block_size)
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn total_blocks_read(&self) -> usize {
        self.total_blocks_read
    }

    pub fn total_blocks_write(&self) -> usize {
        self.total_blocks_write
    }

    fn get_file(&mut self, filename: &str) -> Result<Arc<Mutex<File>>> {
        if let Some(file) = self.open_files.get(filename) {
            Ok(Arc::clone(file))
        } else {
            let path = Path::new(&self.db_dir).join(filename);

            let file = Arc::new(Mutex::new(
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(&path)?,
            ));

            self.open_files
                .insert(filename.to_string(), Arc::clone(&file));

            Ok(file)
        }
    }
}

#[cfg(test)]
mod test {
    use tempfile::tempdir;

    use super::FileManager;
    use crate::file::{block_id::BlockId, page::Page};

    #[test]
    fn test_read_write_int() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let block_size = 512;

        let mut file_manager = FileManager::new(db_dir, block_size).unwrap();

        let filename = "simple_int.tbl";
        let block = BlockId::new(filename, 0);

        let mut page = Page::new(block_size);
        page.set_int(0, 42).unwrap();

        file_manager.write(&block, &mut page).unwrap();
        file_manager.read(&block, &mut page).unwrap();

        assert_eq!(page.get_int(0).unwrap(), 42);
        assert_eq!(file_manager.length(filename).unwrap(), 1);
    }

    #[test]
    fn test_read_write_bytes() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let block_size = 512;

        let mut file_manager = FileManager::new(db_dir, block_size).unwrap();

        let filename = "simple_bytes.tbl";
        let block = BlockId::new(filename, 0);

        let mut page = Page::new(block_size);
        let test_bytes = vec![1, 2, 3, 4, 5];
        page.set_bytes(0, &test_bytes).unwrap();

        file_manager.write(&block, &mut page).unwrap();
        file_manager.read(&block, &mut page).unwrap();

        assert_eq!(page.get_bytes(0).unwrap(), test_bytes);
        assert_eq!(file_manager.length(filename).unwrap(), 1);
    }

    #[test]
    fn test_read_write_string() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let block_size = 512;

        let mut file_manager = FileManager::new(db_dir, block_size).unwrap();

        let filename = "simple_string.tbl";
        let block = BlockId::new(filename, 0);

        let mut page = Page::new(block_size);
        page.set_string(0, "Hello, SimpleDB!").unwrap();

        file_manager.write(&block, &mut page).unwrap();
        file_manager.read(&block, &mut page).unwrap();

        assert_eq!(page.get_string(0).unwrap(), "Hello, SimpleDB!");
        assert_eq!(file_manager.length(filename).unwrap(), 1);
    }

    #[test]
    fn test_append() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let block_size = 512;

        let mut file_manager = FileManager::new(db_dir, block_size).unwrap();

        let filename = "simple.tbl";

        let block1 = file_manager.append(filename).unwrap();
        assert_eq!(block1.block_number(), 0);

        let block2 = file_manager.append(filename).unwrap();
        assert_eq!(block2.block_number(), 1);

        assert_eq!(file_manager.length(filename).unwrap(), 2);
    }

    #[test]
    fn test_read_write_bool() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let block_size = 512;

        let mut file_manager = FileManager::new(db_dir, block_size).unwrap();

        let filename = "simple_bool.tbl";
        let block = BlockId::new(filename, 0);

        let mut page = Page::new(block_size);
        page.set_bool(0, true).unwrap();
        page.set_bool(1, false).unwrap();

        file_manager.write(&block, &mut page).unwrap();
        file_manager.read(&block, &mut page).unwrap();

        assert!(page.get_bool(0).unwrap());
        assert!(!page.get_bool(1).unwrap());
        assert_eq!(file_manager.length(filename).unwrap(), 1);
    }

    #[test]
    fn test_statistics() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let block_size = 512;

        let mut file_manager = FileManager::new(db_dir, block_size).unwrap();

        let filename = "stats_test.tbl";
        let block = BlockId::new(filename, 0);

        let mut page = Page::new(block_size);
        page.set_int(0, 42).unwrap();

        assert_eq!(file_manager.total_blocks_read(), 0);
        assert_eq!(file_manager.total_blocks_write(), 0);

        file_manager.write(&block, &mut page).unwrap();
        assert_eq!(file_manager.total_blocks_write(), 1);

        file_manager.read(&block, &mut page).unwrap();
        assert_eq!(file_manager.total_blocks_read(), 1);

        file_manager.append(filename).unwrap();
        assert_eq!(file_manager.total_blocks_write(), 2);
    }

    #[test]
    fn leftover_temp_file_is_removed_on_open() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        std::fs::write(temp_dir.path().join("tempfile123"), b"junk").unwrap();

        FileManager::new(db_dir, 512).unwrap();

        assert!(!temp_dir.path().join("tempfile123").exists());
    }

    #[test]
    fn ordinary_table_file_is_not_removed() {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        std::fs::write(temp_dir.path().join("students.tbl"), b"keep me").unwrap();

        FileManager::new(db_dir, 512).unwrap();

        assert!(temp_dir.path().join("students.tbl").exists());
    }
}
