use crate::{
    error::Result,
    file::block_id::BlockId,
    record::{record_page::PageFormatter, schema::Schema, table_info::TableInfo, Rid},
    tx::transaction::Transaction,
};

use super::{
    btree_dir::BTreeDir,
    btree_leaf::BTreeLeaf,
    btree_page::{BTPageFormatter, BTreePage, DirEntry},
    constant::Constant,
    index::Index,
};

/// A B-tree implementation of a secondary index: one file of leaf blocks holding
/// `(dataval, block, id)` records sorted by `dataval`, and a directory file whose
/// block 0 is always the root.
pub struct BTreeIndex<'a> {
    tx: &'a mut Transaction,
    leaf_table_info: TableInfo,
    dir_table_info: TableInfo,
    root_block: BlockId,
    leaf: Option<BTreeLeaf>,
}

impl<'a> BTreeIndex<'a> {
    /// Opens the named index, creating its leaf and directory files (and the root's
    /// sentinel directory entry) if they don't exist yet.
    ///
    /// Fixes observed-bug #2: the original compares `tx.size(name) == 0` as intended
    /// here, rather than passing the comparison's result into `size`.
    pub fn new(tx: &'a mut Transaction, idxname: &str, leaf_schema: Schema) -> Result<Self> {
        let leaf_table_info = TableInfo::new(format!("{idxname}leaf"), leaf_schema.clone());
        if tx.size(&leaf_table_info.file_name())? == 0 {
            tx.append(&leaf_table_info.file_name())?;
            let block = BlockId::new(leaf_table_info.file_name(), 0);
            BTPageFormatter {
                table_info: &leaf_table_info,
                flag: -1,
            }
            .format(tx, &block)?;
        }

        let mut dir_schema = Schema::new();
        dir_schema.add("block", &leaf_schema);
        dir_schema.add("dataval", &leaf_schema);
        let dir_table_info = TableInfo::new(format!("{idxname}dir"), dir_schema.clone());
        let root_block = BlockId::new(dir_table_info.file_name(), 0);
        if tx.size(&dir_table_info.file_name())? == 0 {
            tx.append(&dir_table_info.file_name())?;
            BTPageFormatter {
                table_info: &dir_table_info,
                flag: 0,
            }
            .format(tx, &root_block)?;
        }

        let page = BTreePage::new(tx, root_block.clone(), dir_table_info.clone())?;
        if page.get_num_recs(tx)? == 0 {
            let field_type = dir_schema.field_type("dataval");
            let minval = Constant::min_value(field_type);
            page.insert_dir(tx, 0, &minval, 0)?;
        }
        page.close(tx)?;

        Ok(Self {
            tx,
            leaf_table_info,
            dir_table_info,
            root_block,
            leaf: None,
        })
    }

    /// Estimated block accesses to find all index records sharing a search key.
    pub fn search_cost(numblocks: usize, rpb: usize) -> usize {
        if numblocks == 0 || rpb <= 1 {
            return 1;
        }
        1 + (numblocks as f64).log(rpb as f64).floor() as usize
    }
}

impl Index for BTreeIndex<'_> {
    fn before_first(&mut self, search_key: &Constant) -> Result<()> {
        self.close()?;
        let mut root = BTreeDir::new(self.tx, self.root_block.clone(), self.dir_table_info.clone())?;
        let blknum = root.search(self.tx, search_key)?;
        root.close(self.tx)?;
        let leaf_block = BlockId::new(self.leaf_table_info.file_name(), blknum);
        self.leaf = Some(BTreeLeaf::new(
            self.tx,
            leaf_block,
            self.leaf_table_info.clone(),
            search_key.clone(),
        )?);
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        match &mut self.leaf {
            Some(leaf) => leaf.next(self.tx),
            None => Ok(false),
        }
    }

    fn get_data_rid(&mut self) -> Result<Rid> {
        match &self.leaf {
            Some(leaf) => leaf.get_data_rid(self.tx),
            None => unreachable!("get_data_rid called before before_first"),
        }
    }

    fn insert(&mut self, data_val: &Constant, data_rid: Rid) -> Result<()> {
        self.before_first(data_val)?;
        let entry: Option<DirEntry> = {
            let leaf = self.leaf.as_mut().expect("before_first always opens a leaf");
            leaf.insert(self.tx, data_rid)?
        };
        self.close()?;

        let entry = match entry {
            Some(e) => e,
            None => return Ok(()),
        };

        let mut root = BTreeDir::new(self.tx, self.root_block.clone(), self.dir_table_info.clone())?;
        let split = root.insert(self.tx, &entry)?;
        if let Some(e) = split {
            root.make_new_root(self.tx, &e)?;
        }
        root.close(self.tx)
    }

    fn delete(&mut self, data_val: &Constant, data_rid: Rid) -> Result<()> {
        self.before_first(data_val)?;
        if let Some(leaf) = self.leaf.as_mut() {
            leaf.delete(self.tx, &data_rid)?;
        }
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(leaf) = self.leaf.take() {
            leaf.close(self.tx)?;
        }
        Ok(())
    }
}
