use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{DbError, Result},
    record::{schema::FieldType, RecordFile, Schema, TableInfo},
    tx::transaction::Transaction,
};

/// Max length, in characters, of any table or field name stored in the catalog.
pub const MAX_NAME: usize = 16;

fn field_type_code(field_type: FieldType) -> i32 {
    match field_type {
        FieldType::Integer => 0,
        FieldType::Varchar => 1,
    }
}

fn field_type_from_code(code: i32) -> Result<FieldType> {
    match code {
        0 => Ok(FieldType::Integer),
        1 => Ok(FieldType::Varchar),
        other => Err(DbError::SchemaError(format!(
            "unrecognized field type code {other} in catalog"
        ))),
    }
}

/// The catalog manager for tables: creates `tblcat`/`fldcat` on a fresh database,
/// records new tables' schemas into them, and reconstructs a `TableInfo` from them.
pub struct TableMgr {
    tcat_info: TableInfo,
    fcat_info: TableInfo,
}

impl TableMgr {
    pub fn new(is_new: bool, tx: &mut Transaction) -> Result<Self> {
        let mut tcat_schema = Schema::new();
        tcat_schema.add_string_field("tblname", MAX_NAME);
        tcat_schema.add_int_field("reclength");
        let tcat_info = TableInfo::new("tblcat", tcat_schema.clone());

        let mut fcat_schema = Schema::new();
        fcat_schema.add_string_field("tblname", MAX_NAME);
        fcat_schema.add_string_field("fldname", MAX_NAME);
        fcat_schema.add_int_field("type");
        fcat_schema.add_int_field("length");
        fcat_schema.add_int_field("offset");
        let fcat_info = TableInfo::new("fldcat", fcat_schema.clone());

        let mgr = Self {
            tcat_info,
            fcat_info,
        };

        if is_new {
            debug!("bootstrapping tblcat/fldcat");
            mgr.create_table("tblcat", &tcat_schema, tx)?;
            mgr.create_table("fldcat", &fcat_schema, tx)?;
        }

        Ok(mgr)
    }

    /// Validates name length, computes the new table's layout, and records one row
    /// in `tblcat` plus one row per field in `fldcat`.
    pub fn create_table(&self, tblname: &str, schema: &Schema, tx: &mut Transaction) -> Result<()> {
        if tblname.len() > MAX_NAME {
            return Err(DbError::InvalidValue(format!(
                "table name '{tblname}' exceeds the {MAX_NAME}-character limit"
            )));
        }
        for fldname in schema.fields() {
            if fldname.len() > MAX_NAME {
                return Err(DbError::InvalidValue(format!(
                    "field name '{fldname}' exceeds the {MAX_NAME}-character limit"
                )));
            }
        }

        let table_info = TableInfo::new(tblname, schema.clone());

        {
            let mut tcatfile = RecordFile::new(tx, self.tcat_info.clone())?;
            tcatfile.insert()?;
            tcatfile.set_string("tblname", tblname)?;
            tcatfile.set_int("reclength", table_info.record_length() as i32)?;
            tcatfile.close()?;
        }

        {
            let mut fcatfile = RecordFile::new(tx, self.fcat_info.clone())?;
            for fldname in schema.fields() {
                fcatfile.insert()?;
                fcatfile.set_string("tblname", tblname)?;
                fcatfile.set_string("fldname", fldname)?;
                fcatfile.set_int("type", field_type_code(schema.field_type(fldname)))?;
                fcatfile.set_int("length", schema.length(fldname) as i32)?;
                fcatfile.set_int("offset", table_info.offset(fldname) as i32)?;
            }
            fcatfile.close()?;
        }

        debug!(tblname, "created table");
        Ok(())
    }

    /// Rebuilds a table's `TableInfo` (schema, offsets, record length) by scanning
    /// `tblcat`/`fldcat` for its rows.
    pub fn get_table_info(&self, tblname: &str, tx: &mut Transaction) -> Result<TableInfo> {
        let mut reclen = None;
        {
            let mut tcatfile = RecordFile::new(tx, self.tcat_info.clone())?;
            while tcatfile.next()? {
                if tcatfile.get_string("tblname")? == tblname {
                    reclen = Some(tcatfile.get_int("reclength")?);
                    break;
                }
            }
            tcatfile.close()?;
        }
        let reclen = reclen.ok_or_else(|| {
            DbError::SchemaError(format!("no such table '{tblname}' in the catalog"))
        })?;

        let mut schema = Schema::new();
        let mut offsets = HashMap::new();
        {
            let mut fcatfile = RecordFile::new(tx, self.fcat_info.clone())?;
            while fcatfile.next()? {
                if fcatfile.get_string("tblname")? == tblname {
                    let fldname = fcatfile.get_string("fldname")?;
                    let field_type = field_type_from_code(fcatfile.get_int("type")?)?;
                    let length = fcatfile.get_int("length")? as usize;
                    let offset = fcatfile.get_int("offset")? as usize;
                    offsets.insert(fldname.clone(), offset);
                    schema.add_field(&fldname, field_type, length);
                }
            }
            fcatfile.close()?;
        }

        Ok(TableInfo::from_catalog(
            tblname,
            schema,
            offsets,
            reclen as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::{tempdir, TempDir};

    use crate::{
        buffer::manager::BufferManager, file::manager::FileManager, log::manager::LogManager,
        tx::concurrency::lock_table::LockTable,
    };

    use super::*;

    fn new_tx() -> (Transaction, TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_dir = temp_dir.path().to_str().unwrap().to_string();
        let log_file = format!("{db_dir}/simpledb.log");

        let file_manager = Arc::new(Mutex::new(FileManager::new(&db_dir, 400).unwrap()));
        let log_manager = Arc::new(Mutex::new(
            LogManager::new(Arc::clone(&file_manager), &log_file).unwrap(),
        ));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(
            Arc::clone(&file_manager),
            Arc::clone(&log_manager),
            8,
        )));
        let lock_table = Arc::new(Mutex::new(LockTable::new()));
        let tx = Transaction::new(file_manager, log_manager, buffer_manager, lock_table).unwrap();
        (tx, temp_dir)
    }

    #[test]
    fn create_and_reload_table_info() {
        let (mut tx, _dir) = new_tx();
        let mgr = TableMgr::new(true, &mut tx).unwrap();

        let mut schema = Schema::new();
        schema.add_int_field("sid");
        schema.add_string_field("sname", 10);
        mgr.create_table("students", &schema, &mut tx).unwrap();

        let ti = mgr.get_table_info("students", &mut tx).unwrap();
        assert_eq!(ti.table_name(), "students");
        assert!(ti.schema().has_field("sid"));
        assert!(ti.schema().has_field("sname"));
        assert_eq!(ti.record_length(), ti.offset("sname") + ti.schema().length_in_bytes("sname"));

        tx.commit().unwrap();
    }

    #[test]
    fn table_name_over_limit_is_rejected() {
        let (mut tx, _dir) = new_tx();
        let mgr = TableMgr::new(true, &mut tx).unwrap();
        let mut schema = Schema::new();
        schema.add_int_field("x");
        let too_long = "a".repeat(MAX_NAME + 1);
        assert!(mgr.create_table(&too_long, &schema, &mut tx).is_err());
    }
}
