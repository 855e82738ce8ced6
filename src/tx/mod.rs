pub mod bufferlist;
pub mod concurrency;
pub mod recovery;
pub mod transaction;

pub use transaction::Transaction;
