pub mod record_file;
pub mod record_page;
pub mod schema;
pub mod table_info;

pub use record_file::{RecordFile, Rid};
pub use record_page::{PageFormatter, RecordFormatter, RecordPage};
pub use schema::{FieldType, Schema};
pub use table_info::TableInfo;
