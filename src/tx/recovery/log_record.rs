use core::fmt;
use std::sync::{Arc, Mutex};

use num_enum::TryFromPrimitive;

use crate::{
    error::{DbError, Result},
    file::{block_id::BlockId, page::Page},
    log::manager::LogManager,
    tx::transaction::Transaction,
    Lsn,
};

#[derive(Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(i32)]
pub enum LogOperation {
    Checkpoint = 0,
    Start = 1,
    Commit = 2,
    Rollback = 3,
    SetInt = 4,
    SetString = 5,
}

/// A record in the write-ahead log. Only `SetIntRecord`/`SetStringRecord` do anything
/// in `undo` — the others exist to delimit transaction boundaries and checkpoints.
pub trait LogRecord: fmt::Display {
    fn op(&self) -> LogOperation;

    fn tx_number(&self) -> Lsn;

    fn undo(&self, tx: &mut Transaction) -> Result<()>;
}

pub fn create_log_record(bytes: Vec<u8>) -> Result<Box<dyn LogRecord>> {
    let mut p = Page::from_bytes(bytes);
    let value = p.get_int(0)?;
    match LogOperation::try_from(value)
        .map_err(|err| DbError::ProgrammerError(format!("unknown log operation: {}", err.number)))?
    {
        LogOperation::Checkpoint => Ok(Box::new(CheckpointRecord::new())),
        LogOperation::Start => Ok(Box::new(StartRecord::new(&mut p)?)),
        LogOperation::Commit => Ok(Box::new(CommitRecord::new(&mut p)?)),
        LogOperation::Rollback => Ok(Box::new(RollbackRecord::new(&mut p)?)),
        LogOperation::SetInt => Ok(Box::new(SetIntRecord::new(&mut p)?)),
        LogOperation::SetString => Ok(Box::new(SetStringRecord::new(&mut p)?)),
    }
}

const OP_POS: usize = 0;
const TXNUM_POS: usize = std::mem::size_of::<i32>();
const AFTER_TXNUM: usize = TXNUM_POS + std::mem::size_of::<i64>();

pub struct CheckpointRecord {}

impl fmt::Display for CheckpointRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<CHECKPOINT>")
    }
}

impl CheckpointRecord {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write_to_log(log_manager: Arc<Mutex<LogManager>>) -> Result<Lsn> {
        let mut p = Page::new(std::mem::size_of::<i32>());
        p.set_int(0, LogOperation::Checkpoint as i32)?;

        log_manager.lock()?.append(p.contents().as_bytes())
    }
}

impl LogRecord for CheckpointRecord {
    fn op(&self) -> LogOperation {
        LogOperation::Checkpoint
    }
    fn tx_number(&self) -> Lsn {
        -1
    }

    fn undo(&self, _: &mut Transaction) -> Result<()> {
        Ok(())
    }
}

pub struct StartRecord {
    txnum: Lsn,
}

impl fmt::Display for StartRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<START {}>", self.txnum)
    }
}

impl StartRecord {
    pub fn new(p: &mut Page) -> Result<Self> {
        Ok(Self {
            txnum: p.get_i64(TXNUM_POS)?,
        })
    }

    pub fn write_to_log(log_manager: Arc<Mutex<LogManager>>, txnum: Lsn) -> Result<Lsn> {
        let mut p = Page::new(AFTER_TXNUM);
        p.set_int(OP_POS, LogOperation::Start as i32)?;
        p.set_i64(TXNUM_POS, txnum)?;

        log_manager.lock()?.append(p.contents().as_bytes())
    }
}

impl LogRecord for StartRecord {
    fn op(&self) -> LogOperation {
        LogOperation::Start
    }
    fn tx_number(&self) -> Lsn {
        self.txnum
    }

    fn undo(&self, _: &mut Transaction) -> Result<()> {
        Ok(())
    }
}

pub struct CommitRecord {
    txnum: Lsn,
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<COMMIT {}>", self.txnum)
    }
}

impl CommitRecord {
    pub fn new(p: &mut Page) -> Result<Self> {
        Ok(Self {
            txnum: p.get_i64(TXNUM_POS)?,
        })
    }

    pub fn write_to_log(log_manager: Arc<Mutex<LogManager>>, txnum: Lsn) -> Result<Lsn> {
        let mut p = Page::new(AFTER_TXNUM);
        p.set_int(OP_POS, LogOperation::Commit as i32)?;
        p.set_i64(TXNUM_POS, txnum)?;

        log_manager.lock()?.append(p.contents().as_bytes())
    }
}

impl LogRecord for CommitRecord {
    fn op(&self) -> LogOperation {
        LogOperation::Commit
    }
    fn tx_number(&self) -> Lsn {
        self.txnum
    }

    fn undo(&self, _: &mut Transaction) -> Result<()> {
        Ok(())
    }
}

pub struct RollbackRecord {
    txnum: Lsn,
}

impl fmt::Display for RollbackRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<ROLLBACK {}>", self.txnum)
    }
}

impl RollbackRecord {
    pub fn new(p: &mut Page) -> Result<Self> {
        Ok(Self {
            txnum: p.get_i64(TXNUM_POS)?,
        })
    }

    pub fn write_to_log(log_manager: Arc<Mutex<LogManager>>, txnum: Lsn) -> Result<Lsn> {
        let mut p = Page::new(AFTER_TXNUM);
        p.set_int(OP_POS, LogOperation::Rollback as i32)?;
        p.set_i64(TXNUM_POS, txnum)?;

        log_manager.lock()?.append(p.contents().as_bytes())
    }
}

impl LogRecord for RollbackRecord {
    fn op(&self) -> LogOperation {
        LogOperation::Rollback
    }
    fn tx_number(&self) -> Lsn {
        self.txnum
    }

    fn undo(&self, _: &mut Transaction) -> Result<()> {
        Ok(())
    }
}

pub struct SetIntRecord {
    txnum: Lsn,
    offset: usize,
    val: i32,
    block: BlockId,
}

impl fmt::Display for SetIntRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<SETINT {} {} {} {}>",
            self.txnum, self.block, self.offset, self.val
        )
    }
}

impl SetIntRecord {
    pub fn new(p: &mut Page) -> Result<Self> {
        let txnum = p.get_i64(TXNUM_POS)?;
        let fpos = AFTER_TXNUM;
        let filename = p.get_string(fpos)?;
        let bpos = fpos + Page::max_length(filename.len());
        let block_number = p.get_u32(bpos)? as u64;
        let block = BlockId::new(filename, block_number);
        let opos = bpos + std::mem::size_of::<u32>();
        let offset = p.get_int(opos)? as usize;
        let vpos = opos + std::mem::size_of::<i32>();
        let val = p.get_int(vpos)?;

        Ok(Self {
            txnum,
            offset,
            val,
            block,
        })
    }

    /// SETINT, followed by the transaction id, the modified block's filename and
    /// number, the offset within the block, and the value at that offset *before*
    /// the update (the value undo restores).
    pub fn write_to_log(
        log_manager: Arc<Mutex<LogManager>>,
        txnum: Lsn,
        block: &BlockId,
        offset: usize,
        val: i32,
    ) -> Result<Lsn> {
        let fpos = AFTER_TXNUM;
        let bpos = fpos + Page::max_length(block.filename().len());
        let opos = bpos + std::mem::size_of::<u32>();
        let vpos = opos + std::mem::size_of::<i32>();
        let mut p = Page::new(vpos + std::mem::size_of::<i32>());
        p.set_int(OP_POS, LogOperation::SetInt as i32)?;
        p.set_i64(TXNUM_POS, txnum)?;
        p.set_string(fpos, block.filename())?;
        p.set_u32(bpos, block.block_number() as u32)?;
        p.set_int(opos, offset as i32)?;
        p.set_int(vpos, val)?;

        log_manager.lock()?.append(p.contents().as_bytes())
    }
}

impl LogRecord for SetIntRecord {
    fn op(&self) -> LogOperation {
        LogOperation::SetInt
    }
    fn tx_number(&self) -> Lsn {
        self.txnum
    }

    fn undo(&self, tx: &mut Transaction) -> Result<()> {
        tx.pin(&self.block)?;
        tx.set_int(&self.block, self.offset, self.val, false)?;
        tx.unpin(&self.block)?;
        Ok(())
    }
}

pub struct SetStringRecord {
    txnum: Lsn,
    offset: usize,
    val: String,
    block: BlockId,
}

impl fmt::Display for SetStringRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<SETSTRING {} {} {} {}>",
            self.txnum, self.block, self.offset, self.val
        )
    }
}

impl SetStringRecord {
    pub fn new(p: &mut Page) -> Result<Self> {
        let txnum = p.get_i64(TXNUM_POS)?;
        let fpos = AFTER_TXNUM;
        let filename = p.get_string(fpos)?;
        let bpos = fpos + Page::max_length(filename.len());
        let block_number = p.get_u32(bpos)? as u64;
        let block = BlockId::new(filename, block_number);
        let opos = bpos + std::mem::size_of::<u32>();
        let offset = p.get_int(opos)? as usize;
        let vpos = opos + std::mem::size_of::<i32>();
        let val = p.get_string(vpos)?;

        Ok(Self {
            txnum,
            offset,
            val,
            block,
        })
    }

    pub fn write_to_log(
        log_manager: Arc<Mutex<LogManager>>,
        txnum: Lsn,
        block: &BlockId,
        offset: usize,
        val: &str,
    ) -> Result<Lsn> {
        let fpos = AFTER_TXNUM;
        let bpos = fpos + Page::max_length(block.filename().len());
        let opos = bpos + std::mem::size_of::<u32>();
        let vpos = opos + std::mem::size_of::<i32>();
        let mut p = Page::new(vpos + Page::max_length(val.len()));
        p.set_int(OP_POS, LogOperation::SetString as i32)?;
        p.set_i64(TXNUM_POS, txnum)?;
        p.set_string(fpos, block.filename())?;
        p.set_u32(bpos, block.block_number() as u32)?;
        p.set_int(opos, offset as i32)?;
        p.set_string(vpos, val)?;

        log_manager.lock()?.append(p.contents().as_bytes())
    }
}

impl LogRecord for SetStringRecord {
    fn op(&self) -> LogOperation {
        LogOperation::SetString
    }
    fn tx_number(&self) -> Lsn {
        self.txnum
    }

    fn undo(&self, tx: &mut Transaction) -> Result<()> {
        tx.pin(&self.block)?;
        tx.set_string(&self.block, self.offset, &self.val, None, false)?;
        tx.unpin(&self.block)?;
        Ok(())
    }
}
