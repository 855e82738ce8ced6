use crate::{
    error::Result,
    file::block_id::BlockId,
    record::{
        record_page::PageFormatter,
        schema::FieldType,
        table_info::TableInfo,
        Rid,
    },
    tx::transaction::Transaction,
};

use super::constant::Constant;

const INT_SIZE: usize = std::mem::size_of::<i32>();

/// Formats a block as an empty B-tree page: flag and record count set, every record
/// slot zeroed, matching the layout `BTreePage` reads.
pub struct BTPageFormatter<'a> {
    pub table_info: &'a TableInfo,
    pub flag: i32,
}

impl PageFormatter for BTPageFormatter<'_> {
    fn format(&self, tx: &mut Transaction, block: &BlockId) -> Result<()> {
        tx.set_int(block, 0, self.flag, false)?;
        tx.set_int(block, INT_SIZE, 0, false)?;
        let rec_size = self.table_info.record_length();
        let block_size = tx.block_size()?;
        let mut pos = 2 * INT_SIZE;
        while pos + rec_size <= block_size {
            for fldname in self.table_info.schema().fields() {
                let offset = pos + self.table_info.offset(fldname);
                match self.table_info.schema().field_type(fldname) {
                    FieldType::Integer => tx.set_int(block, offset, 0, false)?,
                    FieldType::Varchar => {
                        let max_bytes = self.table_info.schema().length_in_bytes(fldname);
                        tx.set_string(block, offset, "", Some(max_bytes), false)?
                    }
                }
            }
            pos += rec_size;
        }
        Ok(())
    }
}

/// A directory entry produced by a split: the dataval that begins the new block, and
/// the new block's number.
#[derive(Debug, Clone)]
pub struct DirEntry {
    dataval: Constant,
    blocknum: u64,
}

impl DirEntry {
    pub fn new(dataval: Constant, blocknum: u64) -> Self {
        Self { dataval, blocknum }
    }

    pub fn data_val(&self) -> &Constant {
        &self.dataval
    }

    pub fn block_number(&self) -> u64 {
        self.blocknum
    }
}

/// The layout shared by B-tree directory and leaf pages: records stored in sorted
/// order within a single block, splitting when full. Holds no transaction of its own
/// (see the record manager's `RecordPage` for the same design note) — every method
/// takes the active `Transaction` as a parameter.
pub struct BTreePage {
    block: BlockId,
    table_info: TableInfo,
    slot_size: usize,
}

impl BTreePage {
    pub fn new(tx: &mut Transaction, block: BlockId, table_info: TableInfo) -> Result<Self> {
        tx.pin(&block)?;
        let slot_size = table_info.record_length();
        Ok(Self {
            block,
            table_info,
            slot_size,
        })
    }

    pub fn block(&self) -> &BlockId {
        &self.block
    }

    pub fn table_info(&self) -> &TableInfo {
        &self.table_info
    }

    fn slot_pos(&self, slot: i64) -> usize {
        2 * INT_SIZE + slot as usize * self.slot_size
    }

    fn field_pos(&self, slot: i64, fldname: &str) -> usize {
        self.slot_pos(slot) + self.table_info.offset(fldname)
    }

    fn get_int(&self, tx: &mut Transaction, slot: i64, fldname: &str) -> Result<i32> {
        let pos = self.field_pos(slot, fldname);
        tx.get_int(&self.block, pos)
    }

    fn get_string(&self, tx: &mut Transaction, slot: i64, fldname: &str) -> Result<String> {
        let pos = self.field_pos(slot, fldname);
        tx.get_string(&self.block, pos)
    }

    fn get_val(&self, tx: &mut Transaction, slot: i64, fldname: &str) -> Result<Constant> {
        match self.table_info.schema().field_type(fldname) {
            FieldType::Integer => Ok(Constant::Int(self.get_int(tx, slot, fldname)?)),
            FieldType::Varchar => Ok(Constant::Str(self.get_string(tx, slot, fldname)?)),
        }
    }

    fn set_int(&self, tx: &mut Transaction, slot: i64, fldname: &str, val: i32) -> Result<()> {
        let pos = self.field_pos(slot, fldname);
        tx.set_int(&self.block, pos, val, true)
    }

    fn set_string(&self, tx: &mut Transaction, slot: i64, fldname: &str, val: &str) -> Result<()> {
        let pos = self.field_pos(slot, fldname);
        let max_bytes = self.table_info.schema().length_in_bytes(fldname);
        tx.set_string(&self.block, pos, val, Some(max_bytes), true)
    }

    fn set_val(&self, tx: &mut Transaction, slot: i64, fldname: &str, val: &Constant) -> Result<()> {
        match val {
            Constant::Int(v) => self.set_int(tx, slot, fldname, *v),
            Constant::Str(v) => self.set_string(tx, slot, fldname, v),
        }
    }

    pub fn get_num_recs(&self, tx: &mut Transaction) -> Result<i64> {
        Ok(tx.get_int(&self.block, INT_SIZE)? as i64)
    }

    pub fn set_num_recs(&self, tx: &mut Transaction, n: i64) -> Result<()> {
        tx.set_int(&self.block, INT_SIZE, n as i32, true)
    }

    pub fn get_flag(&self, tx: &mut Transaction) -> Result<i32> {
        tx.get_int(&self.block, 0)
    }

    pub fn set_flag(&self, tx: &mut Transaction, val: i32) -> Result<()> {
        tx.set_int(&self.block, 0, val, true)
    }

    fn copy_record(&self, tx: &mut Transaction, from: i64, to: i64) -> Result<()> {
        for fldname in self.table_info.schema().fields().to_vec() {
            let val = self.get_val(tx, from, &fldname)?;
            self.set_val(tx, to, &fldname, &val)?;
        }
        Ok(())
    }

    fn insert(&self, tx: &mut Transaction, slot: i64) -> Result<()> {
        let mut i = self.get_num_recs(tx)?;
        while i > slot {
            self.copy_record(tx, i - 1, i)?;
            i -= 1;
        }
        self.set_num_recs(tx, self.get_num_recs(tx)? + 1)
    }

    pub fn delete(&self, tx: &mut Transaction, slot: i64) -> Result<()> {
        let mut i = slot + 1;
        while i < self.get_num_recs(tx)? {
            self.copy_record(tx, i, i - 1)?;
            i += 1;
        }
        self.set_num_recs(tx, self.get_num_recs(tx)? - 1)
    }

    fn transfer_records(&self, tx: &mut Transaction, slot: i64, dest: &BTreePage) -> Result<()> {
        let mut destslot = 0;
        while slot < self.get_num_recs(tx)? {
            dest.insert(tx, destslot)?;
            for fldname in self.table_info.schema().fields().to_vec() {
                let val = self.get_val(tx, slot, &fldname)?;
                dest.set_val(tx, destslot, &fldname, &val)?;
            }
            self.delete(tx, slot)?;
            destslot += 1;
        }
        Ok(())
    }

    pub fn get_data_val(&self, tx: &mut Transaction, slot: i64) -> Result<Constant> {
        self.get_val(tx, slot, "dataval")
    }

    /// Bug fix (observed-bug #3): full when the next slot would NOT fit in the block.
    pub fn is_full(&self, tx: &mut Transaction) -> Result<bool> {
        let next_pos = self.slot_pos(self.get_num_recs(tx)? + 1);
        Ok(next_pos > tx.block_size()?)
    }

    /// Returns the slot immediately before where `searchkey` would go, so that `+1`
    /// gives the first matching or greater record. Ties go to the leftmost matching
    /// slot (i.e. this returns one before the *first* equal record).
    pub fn find_slot_before(&self, tx: &mut Transaction, searchkey: &Constant) -> Result<i64> {
        let mut slot = 0;
        while slot < self.get_num_recs(tx)? && &self.get_data_val(tx, slot)? < searchkey {
            slot += 1;
        }
        Ok(slot - 1)
    }

    pub fn split(&self, tx: &mut Transaction, splitpos: i64, flag: i32) -> Result<BlockId> {
        let newblk = self.append_new(tx, flag)?;
        let newpage = BTreePage::new(tx, newblk.clone(), self.table_info.clone())?;
        self.transfer_records(tx, splitpos, &newpage)?;
        newpage.set_flag(tx, flag)?;
        newpage.close(tx)?;
        Ok(newblk)
    }

    pub fn get_child_num(&self, tx: &mut Transaction, slot: i64) -> Result<u64> {
        Ok(self.get_int(tx, slot, "block")? as u64)
    }

    pub fn insert_dir(&self, tx: &mut Transaction, slot: i64, val: &Constant, blknum: u64) -> Result<()> {
        self.insert(tx, slot)?;
        self.set_val(tx, slot, "dataval", val)?;
        self.set_int(tx, slot, "block", blknum as i32)
    }

    pub fn get_data_rid(&self, tx: &mut Transaction, slot: i64) -> Result<Rid> {
        let block_number = self.get_int(tx, slot, "block")? as u64;
        let id = self.get_int(tx, slot, "id")? as i64;
        Ok(Rid::new(block_number, id))
    }

    pub fn insert_leaf(&self, tx: &mut Transaction, slot: i64, val: &Constant, rid: &Rid) -> Result<()> {
        self.insert(tx, slot)?;
        self.set_val(tx, slot, "dataval", val)?;
        self.set_int(tx, slot, "block", rid.block_number() as i32)?;
        self.set_int(tx, slot, "id", rid.slot() as i32)
    }

    pub fn append_new(&self, tx: &mut Transaction, flag: i32) -> Result<BlockId> {
        let block = tx.append(&self.table_info.file_name())?;
        BTPageFormatter {
            table_info: &self.table_info,
            flag,
        }
        .format(tx, &block)?;
        Ok(block)
    }

    pub fn close(&self, tx: &mut Transaction) -> Result<()> {
        tx.unpin(&self.block)
    }
}
