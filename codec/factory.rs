// ========================================================================================
//
//                                Variant record factories
//
// ========================================================================================

use crate::error::PgenError;
use crate::pgen::PgenMode;
use crate::record::VariantRecord;
use crate::values::{merge_allele_columns, parse_hard_calls, parse_imputed};

/// Builds variant records from value columns.
///
/// The hard-call factory can also buffer several single-ALT columns for one site and merge
/// them into a multi-allelic record. The imputed factory cannot: dosages do not survive
/// being folded into multi-allelic hard calls, so `add` and `merge` are usage errors there.
#[derive(Debug, Clone)]
pub enum RecordFactory {
    HardCalls { pending: Vec<Vec<u8>> },
    Imputed { threshold: f32 },
}

impl RecordFactory {
    pub fn hard_calls() -> Self {
        RecordFactory::HardCalls {
            pending: Vec::new(),
        }
    }

    pub fn imputed(threshold: f32) -> Result<Self, PgenError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PgenError::InvalidThreshold(threshold));
        }
        Ok(RecordFactory::Imputed { threshold })
    }

    pub fn is_imputed(&self) -> bool {
        matches!(self, RecordFactory::Imputed { .. })
    }

    /// The fixed-width container mode matching the records `parse` produces.
    pub fn fixed_width_mode(&self) -> PgenMode {
        match self {
            RecordFactory::HardCalls { .. } => PgenMode::HardCalls,
            RecordFactory::Imputed { .. } => PgenMode::HardCallsAndDosages,
        }
    }

    /// Number of columns buffered for the next `merge`.
    pub fn pending(&self) -> usize {
        match self {
            RecordFactory::HardCalls { pending } => pending.len(),
            RecordFactory::Imputed { .. } => 0,
        }
    }

    /// Builds a bi-allelic record from one value column.
    pub fn parse(&self, values: &str) -> Result<VariantRecord, PgenError> {
        match self {
            RecordFactory::HardCalls { .. } => VariantRecord::bi_allelic(parse_hard_calls(values)?),
            RecordFactory::Imputed { threshold } => {
                let calls = parse_imputed(values, *threshold)?;
                VariantRecord::bi_allelic_with_dosages(calls.hard_calls, &calls.dosages)
            }
        }
    }

    /// Buffers one single-ALT column for the next `merge`.
    pub fn add(&mut self, values: &str) -> Result<(), PgenError> {
        match self {
            RecordFactory::HardCalls { pending } => {
                let calls = parse_hard_calls(values)?;
                if let Some(existing) = pending.first() {
                    if existing.len() != calls.len() {
                        return Err(PgenError::MalformedValues {
                            expected: existing.len(),
                            found: calls.len(),
                        });
                    }
                }
                pending.push(calls);
                Ok(())
            }
            RecordFactory::Imputed { .. } => Err(PgenError::ImputedGrouping),
        }
    }

    /// Drops every buffered column without merging.
    pub fn discard_pending(&mut self) {
        if let RecordFactory::HardCalls { pending } = self {
            pending.clear();
        }
    }

    /// Folds every buffered column into one multi-allelic record, where the `k`-th column
    /// added describes alternate allele `k + 1`, and clears the buffer.
    pub fn merge(&mut self) -> Result<VariantRecord, PgenError> {
        match self {
            RecordFactory::HardCalls { pending } => {
                if pending.is_empty() {
                    return Err(PgenError::EmptyMerge);
                }
                let columns = std::mem::take(pending);
                let alleles = merge_allele_columns(&columns)?;
                let hard_calls = alleles.hard_calls();
                VariantRecord::multi_allelic(&alleles, hard_calls, columns.len())
            }
            RecordFactory::Imputed { .. } => Err(PgenError::ImputedGrouping),
        }
    }
}

impl Default for RecordFactory {
    fn default() -> Self {
        RecordFactory::hard_calls()
    }
}
