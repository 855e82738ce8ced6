use tracing::trace;

use crate::{error::Result, file::block_id::BlockId, tx::transaction::Transaction};

use super::{schema::FieldType, table_info::TableInfo};

const EMPTY: i32 = 0;
const INUSE: i32 = 1;

/// Initializes a freshly-appended block to look like an empty page of some layout:
/// every slot given default values so later reads never see garbage. Implementations
/// write through the transaction (unlogged, since there is no prior value to undo),
/// not the raw `Page`, so pinning/locking stays consistent with every other write.
pub trait PageFormatter {
    fn format(&self, tx: &mut Transaction, block: &BlockId) -> Result<()>;
}

/// Formats a block as an empty `RecordPage`: every slot's status set to EMPTY, every
/// field zeroed or blanked.
pub struct RecordFormatter<'a> {
    pub table_info: &'a TableInfo,
}

impl PageFormatter for RecordFormatter<'_> {
    fn format(&self, tx: &mut Transaction, block: &BlockId) -> Result<()> {
        RecordPage::format(tx, block, self.table_info)
    }
}

/// Tracks the slot layout of fixed-length records within a single block: each slot is
/// a 4-byte EMPTY/INUSE flag followed by the record's fields at the offsets computed
/// by `TableInfo`. Holds no transaction of its own — every operation takes the active
/// `Transaction` as an argument, so a `RecordFile` can own the transaction and thread
/// it through without a self-referential borrow.
pub struct RecordPage {
    block: BlockId,
    table_info: TableInfo,
    slot_size: usize,
    current_slot: i64,
}

impl RecordPage {
    pub fn new(tx: &mut Transaction, block: BlockId, table_info: TableInfo) -> Result<Self> {
        tx.pin(&block)?;
        let slot_size = table_info.record_length() + std::mem::size_of::<i32>();
        Ok(Self {
            block,
            table_info,
            slot_size,
            current_slot: -1,
        })
    }

    pub fn block(&self) -> &BlockId {
        &self.block
    }

    pub fn current_id(&self) -> i64 {
        self.current_slot
    }

    pub fn move_to_id(&mut self, id: i64) {
        self.current_slot = id;
    }

    /// Formats every slot a block of this size can hold as EMPTY with zeroed field
    /// values, for a freshly-appended block. Values are written unlogged: there is no
    /// prior state to undo, and logging every slot of a block would bloat the log for
    /// no benefit.
    pub fn format(tx: &mut Transaction, block: &BlockId, table_info: &TableInfo) -> Result<()> {
        tx.pin(block)?;
        let slot_size = table_info.record_length() + std::mem::size_of::<i32>();
        let block_size = tx.block_size()?;
        let mut pos = 0;
        while pos + slot_size <= block_size {
            tx.set_int(block, pos, EMPTY, false)?;
            for fldname in table_info.schema().fields() {
                let offset = pos + std::mem::size_of::<i32>() + table_info.offset(fldname);
                match table_info.schema().field_type(fldname) {
                    FieldType::Integer => tx.set_int(block, offset, 0, false)?,
                    FieldType::Varchar => {
                        let max_bytes = table_info.schema().length_in_bytes(fldname);
                        tx.set_string(block, offset, "", Some(max_bytes), false)?
                    }
                }
            }
            pos += slot_size;
        }
        tx.unpin(block)?;
        Ok(())
    }

    pub fn get_int(&self, tx: &mut Transaction, fldname: &str) -> Result<i32> {
        let pos = self.field_pos(fldname);
        tx.get_int(&self.block, pos)
    }

    pub fn get_string(&self, tx: &mut Transaction, fldname: &str) -> Result<String> {
        let pos = self.field_pos(fldname);
        tx.get_string(&self.block, pos)
    }

    pub fn set_int(&self, tx: &mut Transaction, fldname: &str, val: i32) -> Result<()> {
        let pos = self.field_pos(fldname);
        tx.set_int(&self.block, pos, val, true)
    }

    pub fn set_string(&self, tx: &mut Transaction, fldname: &str, val: &str) -> Result<()> {
        let pos = self.field_pos(fldname);
        let max_bytes = self.table_info.schema().length_in_bytes(fldname);
        tx.set_string(&self.block, pos, val, Some(max_bytes), true)
    }

    /// Marks the current record deleted. The current slot doesn't change — call
    /// `next` to move past it.
    pub fn delete(&self, tx: &mut Transaction) -> Result<()> {
        let pos = self.current_pos();
        tx.set_int(&self.block, pos, EMPTY, true)
    }

    /// Finds and claims the next EMPTY slot, returning `false` if the block is full.
    pub fn insert(&mut self, tx: &mut Transaction) -> Result<bool> {
        self.current_slot = -1;
        let found = self.search_for(tx, EMPTY)?;
        if found {
            let pos = self.current_pos();
            tx.set_int(&self.block, pos, INUSE, true)?;
        }
        Ok(found)
    }

    /// Advances to the next INUSE slot, returning `false` if there is none left in
    /// this block.
    pub fn next(&mut self, tx: &mut Transaction) -> Result<bool> {
        self.search_for(tx, INUSE)
    }

    pub fn close(&self, tx: &mut Transaction) -> Result<()> {
        tx.unpin(&self.block)
    }

    fn current_pos(&self) -> usize {
        self.current_slot as usize * self.slot_size
    }

    fn field_pos(&self, fldname: &str) -> usize {
        self.current_pos() + std::mem::size_of::<i32>() + self.table_info.offset(fldname)
    }

    fn is_valid_slot(&self, tx: &mut Transaction) -> Result<bool> {
        Ok(self.current_pos() + self.slot_size <= tx.block_size()?)
    }

    fn search_for(&mut self, tx: &mut Transaction, flag: i32) -> Result<bool> {
        self.current_slot += 1;
        while self.is_valid_slot(tx)? {
            let pos = self.current_pos();
            if tx.get_int(&self.block, pos)? == flag {
                trace!(block = %self.block, slot = self.current_slot, "found matching slot");
                return Ok(true);
            }
            self.current_slot += 1;
        }
        Ok(false)
    }
}
