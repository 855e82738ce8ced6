use std::collections::HashMap;

use super::schema::Schema;

/// Metadata about a table and its records: its schema plus the physical byte offset
/// of each field within a record, computed once and carried by value (not tied to a
/// transaction's lifetime the way the catalog manager's cache is).
#[derive(Debug, Clone)]
pub struct TableInfo {
    tblname: String,
    schema: Schema,
    offsets: HashMap<String, usize>,
    record_length: usize,
}

impl TableInfo {
    /// Computes field offsets for a newly-defined table.
    pub fn new(tblname: impl Into<String>, schema: Schema) -> Self {
        let mut offsets = HashMap::new();
        let mut pos = 0;
        for fldname in schema.fields() {
            offsets.insert(fldname.clone(), pos);
            pos += schema.length_in_bytes(fldname);
        }

        Self {
            tblname: tblname.into(),
            schema,
            offsets,
            record_length: pos,
        }
    }

    /// Rebuilds a `TableInfo` from offsets/record length already stored in the
    /// catalog, avoiding recomputation on every table open.
    pub fn from_catalog(
        tblname: impl Into<String>,
        schema: Schema,
        offsets: HashMap<String, usize>,
        record_length: usize,
    ) -> Self {
        Self {
            tblname: tblname.into(),
            schema,
            offsets,
            record_length,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.tbl", self.tblname)
    }

    pub fn table_name(&self) -> &str {
        &self.tblname
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn offset(&self, fldname: &str) -> usize {
        *self.offsets.get(fldname).expect("field not in table")
    }

    pub fn record_length(&self) -> usize {
        self.record_length
    }
}
