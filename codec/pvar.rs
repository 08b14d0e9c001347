// ========================================================================================
//
//                                   .pvar variant lists
//
// ========================================================================================

use crate::error::PgenError;
use ahash::AHashMap;
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const PVAR_HEADER: &str = "#CHROM\tID\tPOS\tALT\tREF\n";

/// First code handed out to a chromosome name outside the human autosomes, sex chromosomes
/// and mitochondria.
pub const FIRST_UNKNOWN_CODE: u32 = 27;

/// Maps chromosome names to the numeric codes used in the CHROM column. Unrecognised names
/// are numbered in order of first appearance and keep their code for the life of the map.
#[derive(Debug, Clone)]
pub struct ChromosomeCodes {
    codes: AHashMap<String, u32>,
    next_unknown: u32,
}

impl ChromosomeCodes {
    pub fn new() -> Self {
        let mut codes = AHashMap::with_capacity(32);
        for n in 1..=22u32 {
            codes.insert(format!("chr{n}"), n);
        }
        codes.insert("chrX".to_string(), 23);
        codes.insert("chrY".to_string(), 24);
        codes.insert("chrXY".to_string(), 25);
        codes.insert("chrMT".to_string(), 26);
        codes.insert("chrM".to_string(), 26);
        Self {
            codes,
            next_unknown: FIRST_UNKNOWN_CODE,
        }
    }

    pub fn code(&mut self, chromosome: &str) -> u32 {
        if let Some(&code) = self.codes.get(chromosome) {
            return code;
        }
        let code = self.next_unknown;
        self.next_unknown += 1;
        debug!("Assigned code {code} to chromosome '{chromosome}'");
        self.codes.insert(chromosome.to_string(), code);
        code
    }
}

impl Default for ChromosomeCodes {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes one line per variant, in the order the variants reach the paired .pgen stream.
/// The file is created with its header on the first line written, so a writer that never
/// sees a variant leaves nothing on disk.
#[derive(Debug)]
pub struct PvarWriter {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    codes: ChromosomeCodes,
    lines: usize,
}

impl PvarWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            out: None,
            codes: ChromosomeCodes::new(),
            lines: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn write(
        &mut self,
        chromosome: &str,
        position: u64,
        id: &str,
        reference: &str,
        alt: &str,
    ) -> Result<(), PgenError> {
        let code = self.codes.code(chromosome);
        let out = match &mut self.out {
            Some(out) => out,
            None => {
                let file = File::create(&self.path).map_err(|e| PgenError::io(&self.path, e))?;
                let mut out = BufWriter::new(file);
                out.write_all(PVAR_HEADER.as_bytes())
                    .map_err(|e| PgenError::io(&self.path, e))?;
                self.out.insert(out)
            }
        };
        writeln!(out, "{code}\t{id}\t{position}\t{alt}\t{reference}")
            .map_err(|e| PgenError::io(&self.path, e))?;
        self.lines += 1;
        Ok(())
    }

    /// Flushes the file. Returns the number of variant lines, or `None` if the file was
    /// never created.
    pub fn close(self) -> Result<Option<usize>, PgenError> {
        let Some(mut out) = self.out else {
            return Ok(None);
        };
        out.flush().map_err(|e| PgenError::io(&self.path, e))?;
        Ok(Some(self.lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn known_chromosomes_have_fixed_codes() {
        let mut codes = ChromosomeCodes::new();
        assert_eq!(codes.code("chr1"), 1);
        assert_eq!(codes.code("chr22"), 22);
        assert_eq!(codes.code("chrX"), 23);
        assert_eq!(codes.code("chrY"), 24);
        assert_eq!(codes.code("chrXY"), 25);
        assert_eq!(codes.code("chrMT"), 26);
        assert_eq!(codes.code("chrM"), 26);
    }

    #[test]
    fn unknown_chromosomes_get_stable_codes() {
        let mut codes = ChromosomeCodes::new();
        assert_eq!(codes.code("chrUn_gl000220"), 27);
        assert_eq!(codes.code("HLA-A"), 28);
        assert_eq!(codes.code("chrUn_gl000220"), 27);
        assert_eq!(codes.code("chr2"), 2);
    }

    #[test]
    fn lines_follow_the_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.pvar");
        let mut writer = PvarWriter::new(&path);
        writer.write("chr1", 1, "rs1", "A", "C,G").unwrap();
        writer.write("chrX", 42, "rs2", "T", "A").unwrap();
        assert_eq!(writer.close().unwrap(), Some(2));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "#CHROM\tID\tPOS\tALT\tREF\n1\trs1\t1\tC,G\tA\n23\trs2\t42\tA\tT\n"
        );
    }

    #[test]
    fn unused_writer_creates_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.pvar");
        let writer = PvarWriter::new(&path);
        assert_eq!(writer.close().unwrap(), None);
        assert!(!path.exists());
    }
}
