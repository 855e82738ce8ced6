use crate::{error::Result, file::block_id::BlockId, record::{table_info::TableInfo, Rid}, tx::transaction::Transaction};

use super::{
    btree_page::{BTreePage, DirEntry},
    constant::Constant,
};

/// A cursor over one B-tree leaf block (and, transparently, its overflow chain),
/// positioned before the first record matching a search key.
pub struct BTreeLeaf {
    table_info: TableInfo,
    searchkey: Constant,
    contents: BTreePage,
    current_slot: i64,
}

impl BTreeLeaf {
    pub fn new(
        tx: &mut Transaction,
        block: BlockId,
        table_info: TableInfo,
        searchkey: Constant,
    ) -> Result<Self> {
        let contents = BTreePage::new(tx, block, table_info.clone())?;
        let current_slot = contents.find_slot_before(tx, &searchkey)?;
        Ok(Self {
            table_info,
            searchkey,
            contents,
            current_slot,
        })
    }

    pub fn close(&self, tx: &mut Transaction) -> Result<()> {
        self.contents.close(tx)
    }

    /// Moves to the next leaf record matching the search key, including following an
    /// overflow chain. Returns `false` once no more matching records remain.
    pub fn next(&mut self, tx: &mut Transaction) -> Result<bool> {
        self.current_slot += 1;
        if self.current_slot >= self.contents.get_num_recs(tx)? {
            return self.try_overflow(tx);
        }
        if self.contents.get_data_val(tx, self.current_slot)? == self.searchkey {
            Ok(true)
        } else {
            self.try_overflow(tx)
        }
    }

    pub fn get_data_rid(&self, tx: &mut Transaction) -> Result<Rid> {
        self.contents.get_data_rid(tx, self.current_slot)
    }

    pub fn delete(&mut self, tx: &mut Transaction, data_rid: &Rid) -> Result<()> {
        while self.next(tx)? {
            if &self.get_data_rid(tx)? == data_rid {
                self.contents.delete(tx, self.current_slot)?;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Inserts a new leaf record for the search key, splitting the block (or peeling
    /// off an overflow block) if necessary. Returns the directory entry of a newly
    /// created block, if the insert caused a split.
    pub fn insert(&mut self, tx: &mut Transaction, data_rid: Rid) -> Result<Option<DirEntry>> {
        // Overflow-safe prepend: if this block already heads (or follows into) an
        // overflow chain and the new key is smaller than everything already here,
        // move the whole block's contents to a new overflow block first, so the new,
        // smaller key can become the sole record of slot 0.
        if self.contents.get_flag(tx)? >= 0 && self.contents.get_data_val(tx, 0)? > self.searchkey {
            let firstval = self.contents.get_data_val(tx, 0)?;
            let flag = self.contents.get_flag(tx)?;
            let newblk = self.contents.split(tx, 0, flag)?;
            self.current_slot = 0;
            self.contents.set_flag(tx, -1)?;
            self.contents
                .insert_leaf(tx, self.current_slot, &self.searchkey, &data_rid)?;
            return Ok(Some(DirEntry::new(firstval, newblk.block_number())));
        }

        self.current_slot += 1;
        self.contents
            .insert_leaf(tx, self.current_slot, &self.searchkey, &data_rid)?;
        if !self.contents.is_full(tx)? {
            return Ok(None);
        }

        // Full: split. If every key in the block is the same, peel everything but
        // slot 0 into a fresh overflow block instead of a sibling split.
        let firstkey = self.contents.get_data_val(tx, 0)?;
        let num_recs = self.contents.get_num_recs(tx)?;
        let lastkey = self.contents.get_data_val(tx, num_recs - 1)?;
        if lastkey == firstkey {
            let flag = self.contents.get_flag(tx)?;
            let newblk = self.contents.split(tx, 1, flag)?;
            self.contents.set_flag(tx, newblk.block_number() as i32)?;
            return Ok(None);
        }

        let mut splitpos = num_recs / 2;
        let mut splitkey = self.contents.get_data_val(tx, splitpos)?;
        if splitkey == firstkey {
            // move right, looking for the next distinct key
            while self.contents.get_data_val(tx, splitpos)? == splitkey {
                splitpos += 1;
            }
            splitkey = self.contents.get_data_val(tx, splitpos)?;
        } else {
            // move left, looking for the first entry with this key
            while self.contents.get_data_val(tx, splitpos - 1)? == splitkey {
                splitpos -= 1;
            }
        }
        let newblk = self.contents.split(tx, splitpos, -1)?;
        Ok(Some(DirEntry::new(splitkey, newblk.block_number())))
    }

    fn try_overflow(&mut self, tx: &mut Transaction) -> Result<bool> {
        let firstkey = self.contents.get_data_val(tx, 0)?;
        let flag = self.contents.get_flag(tx)?;
        if self.searchkey != firstkey || flag < 0 {
            return Ok(false);
        }
        self.contents.close(tx)?;
        let nextblk = BlockId::new(self.table_info.file_name(), flag as u64);
        self.contents = BTreePage::new(tx, nextblk, self.table_info.clone())?;
        self.current_slot = 0;
        Ok(true)
    }
}
