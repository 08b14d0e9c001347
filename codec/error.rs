use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every failure the encoder can surface. There is no soft-fail mode: a file pair is either
/// written and closed completely, or one of these propagates to the caller.
#[derive(Error, Debug)]
pub enum PgenError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Variant has {found} samples, but this stream was started with {expected}.")]
    SampleCountMismatch { expected: usize, found: usize },
    #[error("A {kind} record cannot be stored in a {mode} stream.")]
    StorageMismatch {
        mode: &'static str,
        kind: &'static str,
    },
    #[error("Cannot merge: no genotype columns have been added since the last merge.")]
    EmptyMerge,
    #[error("Imputed genotypes cannot be grouped into multi-allelic records.")]
    ImputedGrouping,
    #[error("Invalid genotype character {found:?} for sample {index}.")]
    InvalidGenotype { index: usize, found: char },
    #[error("Hard call {code} for sample {index} is not one of 0, 1, 2, 3.")]
    InvalidHardCall { index: usize, code: u8 },
    #[error(
        "Allele pair ({first}, {second}) for sample {index} is not valid at a site with {alt_alleles} alternate alleles."
    )]
    InvalidAllelePair {
        index: usize,
        first: i32,
        second: i32,
        alt_alleles: usize,
    },
    #[error("Sample {index} has hard call {found}, but its allele pair implies {expected}.")]
    HardCallMismatch { index: usize, found: u8, expected: u8 },
    #[error("Value column describes {found} samples, expected {expected}.")]
    MalformedValues { expected: usize, found: usize },
    #[error("Input row has no column {index}.")]
    MissingColumn { index: usize },
    #[error("Could not parse '{value}' as a genomic position.")]
    InvalidPosition { value: String },
    #[error("The {field} count {value} does not fit the 32-bit .pgen header field.")]
    CountOverflow { field: &'static str, value: usize },
    #[error("Imputation threshold {0} is outside [0, 1].")]
    InvalidThreshold(f32),
    #[error("Failed to parse writer configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl PgenError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        PgenError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
