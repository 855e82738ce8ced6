use crate::{error::Result, file::block_id::BlockId, record::table_info::TableInfo, tx::transaction::Transaction};

use super::{
    btree_page::{BTreePage, DirEntry},
    constant::Constant,
};

/// A B-tree directory block: entries sorted by `dataval`, each pointing at a child
/// block one level down. The directory file's block 0 is always the tree's root.
pub struct BTreeDir {
    table_info: TableInfo,
    filename: String,
    contents: BTreePage,
}

impl BTreeDir {
    pub fn new(tx: &mut Transaction, block: BlockId, table_info: TableInfo) -> Result<Self> {
        let filename = block.filename().to_string();
        let contents = BTreePage::new(tx, block, table_info.clone())?;
        Ok(Self {
            table_info,
            filename,
            contents,
        })
    }

    pub fn close(&self, tx: &mut Transaction) -> Result<()> {
        self.contents.close(tx)
    }

    fn find_child_block(
        &self,
        tx: &mut Transaction,
        searchkey: &Constant,
    ) -> Result<BlockId> {
        let mut slot = self.contents.find_slot_before(tx, searchkey)?;
        if &self.contents.get_data_val(tx, slot + 1)? == searchkey {
            slot += 1;
        }
        let blknum = self.contents.get_child_num(tx, slot)?;
        Ok(BlockId::new(self.filename.clone(), blknum))
    }

    fn insert_entry(
        &mut self,
        tx: &mut Transaction,
        entry: &DirEntry,
    ) -> Result<Option<DirEntry>> {
        let newslot = 1 + self.contents.find_slot_before(tx, entry.data_val())?;
        self.contents
            .insert_dir(tx, newslot, entry.data_val(), entry.block_number())?;
        if !self.contents.is_full(tx)? {
            return Ok(None);
        }
        let level = self.contents.get_flag(tx)?;
        let num_recs = self.contents.get_num_recs(tx)?;
        let splitpos = num_recs / 2;
        let splitval = self.contents.get_data_val(tx, splitpos)?;
        let newblk = self.contents.split(tx, splitpos, level)?;
        Ok(Some(DirEntry::new(splitval, newblk.block_number())))
    }

    /// Returns the block number of the leaf block that holds `searchkey`, descending
    /// one directory level per loop iteration until `contents` is a leaf-level block
    /// (flag 0).
    pub fn search(&mut self, tx: &mut Transaction, searchkey: &Constant) -> Result<u64> {
        let mut childblk = self.find_child_block(tx, searchkey)?;
        while self.contents.get_flag(tx)? > 0 {
            self.contents.close(tx)?;
            self.contents = BTreePage::new(tx, childblk.clone(), self.table_info.clone())?;
            childblk = self.find_child_block(tx, searchkey)?;
        }
        Ok(childblk.block_number())
    }

    /// Moves the root's contents to a fresh block and writes a two-entry root at
    /// block 0 (the old root, plus `entry`), bumping the level by one. Block 0 stays
    /// the root, preserving invariant I7.
    pub fn make_new_root(&mut self, tx: &mut Transaction, entry: &DirEntry) -> Result<()> {
        let firstval = self.contents.get_data_val(tx, 0)?;
        let level = self.contents.get_flag(tx)?;
        let newblk = self.contents.split(tx, 0, level)?;
        let oldroot = DirEntry::new(firstval, newblk.block_number());
        self.insert_entry(tx, &oldroot)?;
        self.insert_entry(tx, entry)?;
        self.contents.set_flag(tx, level + 1)
    }

    /// Inserts a directory entry, descending to level 0 first if this block isn't
    /// already there. A `Some` return means this block split and the returned entry
    /// must be inserted into the parent (or a new root created, at the top level).
    pub fn insert(&mut self, tx: &mut Transaction, entry: &DirEntry) -> Result<Option<DirEntry>> {
        if self.contents.get_flag(tx)? == 0 {
            return self.insert_entry(tx, entry);
        }
        let childblk = self.find_child_block(tx, entry.data_val())?;
        let mut child = BTreeDir::new(tx, childblk, self.table_info.clone())?;
        let child_entry = child.insert(tx, entry)?;
        child.close(tx)?;
        match child_entry {
            Some(e) => self.insert_entry(tx, &e),
            None => Ok(None),
        }
    }
}
