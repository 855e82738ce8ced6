use tracing::debug;

use crate::{error::Result, record::{RecordFile, Schema}, tx::transaction::Transaction};

use super::table_mgr::{TableMgr, MAX_NAME};

/// Max length, in characters, of a stored view definition. spec.md §4.10 fixes this
/// at 100 (the original source's `ViewMgr.MAX_VIEWDEF` is 80; the spec's number wins).
pub const MAX_VIEWDEF: usize = 100;

/// Bootstraps `viewcat` and records/retrieves view definitions through it. Holds no
/// state of its own: `table_mgr` is a sibling field on `MetaDataMgr`, passed in on
/// every call rather than borrowed, so the bundle of managers doesn't self-reference.
pub struct ViewMgr;

impl ViewMgr {
    pub fn new(is_new: bool, table_mgr: &TableMgr, tx: &mut Transaction) -> Result<Self> {
        if is_new {
            let mut schema = Schema::new();
            schema.add_string_field("viewname", MAX_NAME);
            schema.add_string_field("viewdef", MAX_VIEWDEF);
            debug!("bootstrapping viewcat");
            table_mgr.create_table("viewcat", &schema, tx)?;
        }
        Ok(Self)
    }

    pub fn create_view(
        &self,
        table_mgr: &TableMgr,
        vname: &str,
        vdef: &str,
        tx: &mut Transaction,
    ) -> Result<()> {
        let table_info = table_mgr.get_table_info("viewcat", tx)?;
        let mut rf = RecordFile::new(tx, table_info)?;
        rf.insert()?;
        rf.set_string("viewname", vname)?;
        rf.set_string("viewdef", vdef)?;
        rf.close()
    }

    pub fn get_view_def(
        &self,
        table_mgr: &TableMgr,
        vname: &str,
        tx: &mut Transaction,
    ) -> Result<Option<String>> {
        let table_info = table_mgr.get_table_info("viewcat", tx)?;
        let mut rf = RecordFile::new(tx, table_info)?;
        let mut result = None;
        while rf.next()? {
            if rf.get_string("viewname")? == vname {
                result = Some(rf.get_string("viewdef")?);
                break;
            }
        }
        rf.close()?;
        Ok(result)
    }
}
