use super::{
    BUFFER_LEN, MAGIC, PgenMode, PgenSummary, RecordBuffer, check_sample_count, header_count,
};
use crate::error::PgenError;
use crate::record::VariantRecord;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Maximum number of variants per block.
pub const BLOCK_LEN: usize = 65_536;

const HEADER_LEN: u64 = 12;

/// Header control byte: 1-byte type codes and 4-byte record lengths.
const HEADER_CONTROL: u8 = 0x07;

/// Per-variant table bytes: one type code and one 4-byte length.
const TABLE_BYTES_PER_VARIANT: u64 = 5;

/// The metadata of one block whose payload sits in a temporary file.
#[derive(Debug)]
struct BlockIndex {
    path: PathBuf,
    types: Vec<u8>,
    lengths: Vec<u32>,
    byte_len: u64,
}

#[derive(Debug)]
struct OpenBlock {
    index: BlockIndex,
    file: File,
}

impl OpenBlock {
    fn create(dir: &Path, stem: &str, number: usize) -> Result<Self, PgenError> {
        let prefix = format!("{stem}.block{number}.");
        let (file, path) = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| PgenError::io(dir, e))?
            .keep()
            .map_err(|e| PgenError::io(dir, e.error))?;
        debug!("Opened block {number} at {}", path.display());
        Ok(Self {
            index: BlockIndex {
                path,
                types: Vec::with_capacity(BLOCK_LEN),
                lengths: Vec::with_capacity(BLOCK_LEN),
                byte_len: 0,
            },
            file,
        })
    }

    fn is_full(&self) -> bool {
        self.index.types.len() >= BLOCK_LEN
    }
}

/// Streams records into per-block temporary files, then assembles the final file on close:
/// header, block offset table, per-block type and length tables, then the block payloads.
#[derive(Debug)]
pub struct VariableWidthPgenStream {
    path: PathBuf,
    temp_dir: Option<PathBuf>,
    sealed: Vec<BlockIndex>,
    current: Option<OpenBlock>,
    buffer: RecordBuffer,
    variants: usize,
    samples: Option<usize>,
}

impl VariableWidthPgenStream {
    pub fn new(path: PathBuf, temp_dir: Option<PathBuf>) -> Self {
        Self {
            path,
            temp_dir,
            sealed: Vec::new(),
            current: None,
            buffer: RecordBuffer::new(),
            variants: 0,
            samples: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variant_count(&self) -> usize {
        self.variants
    }

    /// Temporary block files created so far, including the one being filled.
    pub fn block_paths(&self) -> Vec<&Path> {
        self.sealed
            .iter()
            .map(|block| block.path.as_path())
            .chain(self.current.iter().map(|block| block.index.path.as_path()))
            .collect()
    }

    fn block_dir(&self) -> PathBuf {
        match &self.temp_dir {
            Some(dir) => dir.clone(),
            None => match self.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    fn seal_current(&mut self) -> Result<(), PgenError> {
        if let Some(mut block) = self.current.take() {
            self.buffer.flush(&mut block.file, &block.index.path)?;
            block
                .file
                .flush()
                .map_err(|e| PgenError::io(&block.index.path, e))?;
            debug!(
                "Sealed block {} with {} variants ({} bytes)",
                self.sealed.len(),
                block.index.types.len(),
                block.index.byte_len
            );
            self.sealed.push(block.index);
        }
        Ok(())
    }

    pub fn write(&mut self, record: &mut VariantRecord) -> Result<(), PgenError> {
        check_sample_count(&mut self.samples, record)?;

        if self.current.as_ref().is_some_and(OpenBlock::is_full) {
            self.seal_current()?;
        }
        let block = match &mut self.current {
            Some(block) => block,
            None => {
                let stem = self
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "pgen".to_string());
                let block = OpenBlock::create(&self.block_dir(), &stem, self.sealed.len())?;
                self.current.insert(block)
            }
        };

        let produced = self
            .buffer
            .drain(record, &mut block.file, &block.index.path)?;
        let length = u32::try_from(produced).map_err(|_| PgenError::CountOverflow {
            field: "record byte",
            value: produced as usize,
        })?;
        block.index.types.push(record.storage_type());
        block.index.lengths.push(length);
        block.index.byte_len += produced;
        self.variants += 1;
        Ok(())
    }

    /// Assembles the output file. On failure the remaining temporary block files are left
    /// in place.
    pub fn close(mut self) -> Result<Option<PgenSummary>, PgenError> {
        self.seal_current()?;
        if self.variants == 0 {
            debug!("No variants written; {} was not created", self.path.display());
            return Ok(None);
        }

        match self.assemble() {
            Ok(summary) => Ok(Some(summary)),
            Err(e) => {
                let leftover: Vec<_> = self
                    .sealed
                    .iter()
                    .filter(|block| block.path.exists())
                    .map(|block| block.path.display().to_string())
                    .collect();
                if !leftover.is_empty() {
                    warn!(
                        "Leaving {} temporary block files behind: {}",
                        leftover.len(),
                        leftover.join(", ")
                    );
                }
                Err(e)
            }
        }
    }

    fn assemble(&self) -> Result<PgenSummary, PgenError> {
        let path = &self.path;
        let samples = self.samples.unwrap_or(0);
        let variant_field = header_count("variant", self.variants)?;
        let sample_field = header_count("sample", samples)?;

        let file = File::create(path).map_err(|e| PgenError::io(path, e))?;
        let mut out = BufWriter::with_capacity(BUFFER_LEN, file);
        let io_err = |e: io::Error| PgenError::io(path, e);

        let mut header = [0u8; HEADER_LEN as usize];
        header[..2].copy_from_slice(&MAGIC);
        header[2] = PgenMode::VariableWidth.mode_byte();
        header[3..7].copy_from_slice(&variant_field.to_le_bytes());
        header[7..11].copy_from_slice(&sample_field.to_le_bytes());
        header[11] = HEADER_CONTROL;
        out.write_all(&header).map_err(io_err)?;

        let mut offset = HEADER_LEN
            + 8 * self.sealed.len() as u64
            + TABLE_BYTES_PER_VARIANT * self.variants as u64;
        for block in &self.sealed {
            out.write_all(&offset.to_le_bytes()).map_err(io_err)?;
            offset += block.byte_len;
        }

        for block in &self.sealed {
            out.write_all(&block.types).map_err(io_err)?;
            for length in &block.lengths {
                out.write_all(&length.to_le_bytes()).map_err(io_err)?;
            }
        }

        for block in &self.sealed {
            let mut payload =
                File::open(&block.path).map_err(|e| PgenError::io(&block.path, e))?;
            let copied = io::copy(&mut payload, &mut out).map_err(io_err)?;
            if copied != block.byte_len {
                return Err(PgenError::io(
                    &block.path,
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("expected {} block bytes, found {copied}", block.byte_len),
                    ),
                ));
            }
            drop(payload);
            fs::remove_file(&block.path).map_err(|e| PgenError::io(&block.path, e))?;
        }
        out.flush().map_err(io_err)?;

        info!(
            "Wrote {} variants x {} samples in {} blocks to {} ({} bytes)",
            self.variants,
            samples,
            self.sealed.len(),
            path.display(),
            offset
        );

        Ok(PgenSummary {
            path: path.clone(),
            mode: PgenMode::VariableWidth,
            variants: self.variants,
            samples,
            blocks: self.sealed.len(),
            bytes: offset,
        })
    }
}
