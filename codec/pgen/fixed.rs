use super::{MAGIC, PgenMode, PgenSummary, RecordBuffer, check_sample_count, header_count};
use crate::error::PgenError;
use crate::record::{RecordKind, VariantRecord};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Offset of the variant and sample counts patched in on close.
const COUNTS_OFFSET: u64 = 3;

/// Header control byte. Fixed-width files carry no per-variant tables.
const HEADER_CONTROL: u8 = 0x00;

/// Writes bi-allelic records back to back after a 12-byte header whose counts are only
/// known, and patched in, at close.
#[derive(Debug)]
pub struct FixedWidthPgenStream {
    path: PathBuf,
    mode: PgenMode,
    output: Option<FixedOutput>,
    variants: usize,
    samples: Option<usize>,
    bytes: u64,
}

#[derive(Debug)]
struct FixedOutput {
    file: File,
    buffer: RecordBuffer,
    header_len: u64,
}

impl FixedOutput {
    /// Creates the file and stages the header with zeroed counts.
    fn create(path: &Path, mode: PgenMode) -> Result<Self, PgenError> {
        debug!("Creating {} .pgen at {}", mode.name(), path.display());
        let mut file = File::create(path).map_err(|e| PgenError::io(path, e))?;
        let mut buffer = RecordBuffer::new();
        let mut header = [0u8; 12];
        header[..2].copy_from_slice(&MAGIC);
        header[2] = mode.mode_byte();
        header[11] = HEADER_CONTROL;
        buffer.put(&header, &mut file, path)?;
        Ok(Self {
            file,
            buffer,
            header_len: header.len() as u64,
        })
    }
}

impl FixedWidthPgenStream {
    pub fn new(path: PathBuf, mode: PgenMode) -> Self {
        Self {
            path,
            mode,
            output: None,
            variants: 0,
            samples: None,
            bytes: 0,
        }
    }

    pub fn mode(&self) -> PgenMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variant_count(&self) -> usize {
        self.variants
    }

    fn accepts(&self, kind: RecordKind) -> bool {
        matches!(
            (self.mode, kind),
            (PgenMode::HardCalls, RecordKind::BiAllelicHardCalls)
                | (PgenMode::HardCallsAndDosages, RecordKind::BiAllelicHardCallsAndDosages)
        )
    }

    pub fn write(&mut self, record: &mut VariantRecord) -> Result<(), PgenError> {
        if !self.accepts(record.kind()) {
            return Err(PgenError::StorageMismatch {
                mode: self.mode.name(),
                kind: record.kind().name(),
            });
        }
        check_sample_count(&mut self.samples, record)?;

        let output = match &mut self.output {
            Some(output) => output,
            None => {
                let output = FixedOutput::create(&self.path, self.mode)?;
                self.bytes = output.header_len;
                self.output.insert(output)
            }
        };

        self.bytes += output
            .buffer
            .drain(record, &mut output.file, &self.path)?;
        self.variants += 1;
        Ok(())
    }

    pub fn close(mut self) -> Result<Option<PgenSummary>, PgenError> {
        let Some(FixedOutput {
            mut file,
            mut buffer,
            ..
        }) = self.output.take()
        else {
            debug!("No variants written; {} was not created", self.path.display());
            return Ok(None);
        };
        buffer.flush(&mut file, &self.path)?;
        file.flush().map_err(|e| PgenError::io(&self.path, e))?;
        drop(file);

        let samples = self.samples.unwrap_or(0);
        let mut counts = [0u8; 8];
        counts[..4].copy_from_slice(&header_count("variant", self.variants)?.to_le_bytes());
        counts[4..].copy_from_slice(&header_count("sample", samples)?.to_le_bytes());

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| PgenError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(COUNTS_OFFSET))
            .and_then(|_| file.write_all(&counts))
            .and_then(|_| file.sync_all())
            .map_err(|e| PgenError::io(&self.path, e))?;

        info!(
            "Wrote {} variants x {} samples to {} ({} bytes)",
            self.variants,
            samples,
            self.path.display(),
            self.bytes
        );

        Ok(Some(PgenSummary {
            path: self.path,
            mode: self.mode,
            variants: self.variants,
            samples,
            blocks: 0,
            bytes: self.bytes,
        }))
    }
}
