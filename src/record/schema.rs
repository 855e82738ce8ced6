use std::collections::HashMap;

use crate::file::page::Page;

/// The SQL types a field can hold. A closed set, so a tagged enum rather than a
/// trait object (see the Record manager module note).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Varchar,
}

#[derive(Debug, Clone)]
struct FieldInfo {
    field_type: FieldType,
    length: usize,
}

/// The record schema of a table: each field's name, type, and (for VARCHAR fields)
/// conceptual length.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    info: HashMap<String, FieldInfo>,
    order: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, fldname: &str, field_type: FieldType, length: usize) {
        if !self.info.contains_key(fldname) {
            self.order.push(fldname.to_string());
        }
        self.info.insert(
            fldname.to_string(),
            FieldInfo { field_type, length },
        );
    }

    pub fn add_int_field(&mut self, fldname: &str) {
        self.add_field(fldname, FieldType::Integer, 0);
    }

    pub fn add_string_field(&mut self, fldname: &str, length: usize) {
        self.add_field(fldname, FieldType::Varchar, length);
    }

    /// Adds `fldname` with the same type and length as in `other`.
    pub fn add(&mut self, fldname: &str, other: &Schema) {
        let field_type = other.field_type(fldname);
        let length = other.length(fldname);
        self.add_field(fldname, field_type, length);
    }

    pub fn add_all(&mut self, other: &Schema) {
        for fldname in &other.order {
            self.add(fldname, other);
        }
    }

    pub fn field_type(&self, fldname: &str) -> FieldType {
        self.info
            .get(fldname)
            .map(|i| i.field_type)
            .expect("field not in schema")
    }

    pub fn length(&self, fldname: &str) -> usize {
        self.info.get(fldname).map(|i| i.length).unwrap_or(0)
    }

    pub fn has_field(&self, fldname: &str) -> bool {
        self.info.contains_key(fldname)
    }

    pub fn fields(&self) -> &[String] {
        &self.order
    }

    /// Bytes needed to store `fldname`'s value, including the 4-byte length prefix
    /// for VARCHAR fields.
    pub fn length_in_bytes(&self, fldname: &str) -> usize {
        match self.field_type(fldname) {
            FieldType::Integer => std::mem::size_of::<i32>(),
            FieldType::Varchar => Page::max_length(self.length(fldname)),
        }
    }
}
