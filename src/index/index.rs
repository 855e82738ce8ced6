use crate::{error::Result, record::Rid};

use super::constant::Constant;

/// The abstraction point for "hash vs B-tree" indexes (§9). Only a B-tree
/// implementation exists in this crate; hash indexing is out of scope, but the trait
/// is kept open so a second implementation could be added without touching callers.
pub trait Index {
    fn before_first(&mut self, search_key: &Constant) -> Result<()>;
    fn next(&mut self) -> Result<bool>;
    fn get_data_rid(&mut self) -> Result<Rid>;
    fn insert(&mut self, data_val: &Constant, data_rid: Rid) -> Result<()>;
    fn delete(&mut self, data_val: &Constant, data_rid: Rid) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
