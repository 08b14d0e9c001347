// ========================================================================================
//
//                                  .pgen output streams
//
// ========================================================================================
//
// Container writers that accept a sequence of variant records and lay them out in one of
// the two .pgen storage layouts. Both layouts only become readable once `close` returns.

pub mod fixed;
pub mod variable;

use crate::error::PgenError;
use crate::record::VariantRecord;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use fixed::FixedWidthPgenStream;
pub use variable::VariableWidthPgenStream;

/// The two magic bytes that open every .pgen file.
pub const MAGIC: [u8; 2] = [0x6C, 0x1B];

/// Size of the reusable buffer records are drained through.
pub const BUFFER_LEN: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgenMode {
    /// Fixed-width bi-allelic hard calls.
    HardCalls,
    /// Fixed-width bi-allelic hard calls, each record followed by its dosages.
    HardCallsAndDosages,
    /// Variable-width records with a per-variant type and length table.
    VariableWidth,
}

impl PgenMode {
    pub fn mode_byte(self) -> u8 {
        match self {
            PgenMode::HardCalls => 0x02,
            PgenMode::HardCallsAndDosages => 0x03,
            PgenMode::VariableWidth => 0x10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PgenMode::HardCalls => "fixed-width hard-call",
            PgenMode::HardCallsAndDosages => "fixed-width dosage",
            PgenMode::VariableWidth => "variable-width",
        }
    }
}

/// What a closed stream put on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgenSummary {
    pub path: PathBuf,
    pub mode: PgenMode,
    pub variants: usize,
    pub samples: usize,
    pub blocks: usize,
    pub bytes: u64,
}

/// A .pgen writer in either storage layout.
#[derive(Debug)]
pub enum PgenOutputStream {
    Fixed(FixedWidthPgenStream),
    Variable(VariableWidthPgenStream),
}

impl PgenOutputStream {
    /// Prepares a stream for `path`. No file is touched until the first record arrives.
    pub fn create(path: impl Into<PathBuf>, mode: PgenMode) -> Self {
        let path = path.into();
        match mode {
            PgenMode::VariableWidth => {
                PgenOutputStream::Variable(VariableWidthPgenStream::new(path, None))
            }
            fixed => PgenOutputStream::Fixed(FixedWidthPgenStream::new(path, fixed)),
        }
    }

    /// A variable-width stream whose per-block temporary files live in `temp_dir` instead
    /// of next to the output.
    pub fn variable_in(path: impl Into<PathBuf>, temp_dir: Option<PathBuf>) -> Self {
        PgenOutputStream::Variable(VariableWidthPgenStream::new(path.into(), temp_dir))
    }

    pub fn mode(&self) -> PgenMode {
        match self {
            PgenOutputStream::Fixed(stream) => stream.mode(),
            PgenOutputStream::Variable(_) => PgenMode::VariableWidth,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            PgenOutputStream::Fixed(stream) => stream.path(),
            PgenOutputStream::Variable(stream) => stream.path(),
        }
    }

    pub fn variant_count(&self) -> usize {
        match self {
            PgenOutputStream::Fixed(stream) => stream.variant_count(),
            PgenOutputStream::Variable(stream) => stream.variant_count(),
        }
    }

    pub fn write(&mut self, record: &mut VariantRecord) -> Result<(), PgenError> {
        match self {
            PgenOutputStream::Fixed(stream) => stream.write(record),
            PgenOutputStream::Variable(stream) => stream.write(record),
        }
    }

    /// Finishes the file. Returns `None` when no variant was ever written, in which case
    /// nothing exists on disk.
    pub fn close(self) -> Result<Option<PgenSummary>, PgenError> {
        match self {
            PgenOutputStream::Fixed(stream) => stream.close(),
            PgenOutputStream::Variable(stream) => stream.close(),
        }
    }
}

/// Pins the sample count to the first record seen.
pub(crate) fn check_sample_count(
    expected: &mut Option<usize>,
    record: &VariantRecord,
) -> Result<usize, PgenError> {
    let found = record.sample_count();
    match *expected {
        Some(samples) if samples != found => Err(PgenError::SampleCountMismatch {
            expected: samples,
            found,
        }),
        Some(samples) => Ok(samples),
        None => {
            *expected = Some(found);
            Ok(found)
        }
    }
}

pub(crate) fn header_count(field: &'static str, value: usize) -> Result<u32, PgenError> {
    u32::try_from(value).map_err(|_| PgenError::CountOverflow { field, value })
}

/// A fixed-size byte buffer records are drained into, flushed to a sink whenever a record
/// cannot make further progress in what is left of it.
#[derive(Debug)]
pub(crate) struct RecordBuffer {
    bytes: Box<[u8]>,
    filled: usize,
}

impl RecordBuffer {
    pub(crate) fn new() -> Self {
        Self::with_capacity(BUFFER_LEN)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            filled: 0,
        }
    }

    /// Appends raw bytes, flushing first if they do not fit.
    pub(crate) fn put<W: Write>(
        &mut self,
        data: &[u8],
        sink: &mut W,
        path: &Path,
    ) -> Result<(), PgenError> {
        if self.filled + data.len() > self.bytes.len() {
            self.flush(sink, path)?;
        }
        if data.len() > self.bytes.len() {
            return sink.write_all(data).map_err(|e| PgenError::io(path, e));
        }
        self.bytes[self.filled..self.filled + data.len()].copy_from_slice(data);
        self.filled += data.len();
        Ok(())
    }

    /// Runs the streaming protocol on `record` until it reports done and returns the number
    /// of bytes it produced.
    pub(crate) fn drain<W: Write>(
        &mut self,
        record: &mut VariantRecord,
        sink: &mut W,
        path: &Path,
    ) -> Result<u64, PgenError> {
        let mut produced = 0u64;
        loop {
            let progress = record.write(&mut self.bytes[self.filled..]);
            self.filled += progress.written;
            produced += progress.written as u64;
            if progress.done {
                return Ok(produced);
            }
            if progress.written == 0 && self.filled == 0 {
                // A window of the full buffer must always make room for at least one value.
                return Err(PgenError::io(
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "record made no progress in an empty buffer",
                    ),
                ));
            }
            self.flush(sink, path)?;
        }
    }

    pub(crate) fn flush<W: Write>(&mut self, sink: &mut W, path: &Path) -> Result<(), PgenError> {
        if self.filled > 0 {
            sink.write_all(&self.bytes[..self.filled])
                .map_err(|e| PgenError::io(path, e))?;
            self.filled = 0;
        }
        Ok(())
    }
}
