// ========================================================================================
//
//                                   Variant records
//
// ========================================================================================
//
// A variant record is the full serialized form of one variant across all samples, built
// from an ordered list of data tracks. The set of record layouts is closed:
//
//   - bi-allelic hard calls:            main track
//   - bi-allelic hard calls + dosages:  main track, dosage track
//   - multi-allelic hard calls:         main track, summary byte, then for each patch
//                                       category with at least one flagged sample its
//                                       flag track and value track
//
// In the multi-allelic layout the main track only knows about the first alternate allele.
// Category 1 patches heterozygotes whose non-reference allele is not ALT1; category 2
// patches non-reference homozygotes/compound heterozygotes other than ALT1/ALT1.

use crate::bits::BitWidth;
use crate::error::PgenError;
use crate::track::{DataTrack, Progress};
use crate::values::{self, AllelePairs, HET, HOM_ALT, MISSING, MISSING_ALLELE};

/// Storage-type code of a bi-allelic hard-call record.
pub const BIALLELIC_HARD_CALLS_TYPE: u8 = 0x00;
/// Storage-type code of a bi-allelic hard-call record followed by dosages.
pub const BIALLELIC_DOSAGES_TYPE: u8 = 0x40;
/// Storage-type code of a multi-allelic hard-call record.
pub const MULTIALLELIC_HARD_CALLS_TYPE: u8 = 0x08;

/// Scale of the 16-bit fixed-point dosage encoding.
pub const DOSAGE_SCALE: f32 = 16_384.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    BiAllelicHardCalls,
    BiAllelicHardCallsAndDosages,
    MultiAllelicHardCalls { alt_alleles: usize },
}

impl RecordKind {
    /// The opaque one-byte code persisted in the variable-width type table.
    pub fn storage_type(self) -> u8 {
        match self {
            RecordKind::BiAllelicHardCalls => BIALLELIC_HARD_CALLS_TYPE,
            RecordKind::BiAllelicHardCallsAndDosages => BIALLELIC_DOSAGES_TYPE,
            RecordKind::MultiAllelicHardCalls { .. } => MULTIALLELIC_HARD_CALLS_TYPE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordKind::BiAllelicHardCalls => "bi-allelic hard-call",
            RecordKind::BiAllelicHardCallsAndDosages => "bi-allelic dosage",
            RecordKind::MultiAllelicHardCalls { .. } => "multi-allelic hard-call",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariantRecord {
    kind: RecordKind,
    sample_count: usize,
    tracks: Vec<DataTrack>,
    current: usize,
}

impl VariantRecord {
    pub fn bi_allelic(hard_calls: Vec<u8>) -> Result<Self, PgenError> {
        check_hard_calls(&hard_calls)?;
        let sample_count = hard_calls.len();
        Ok(Self::assemble(
            RecordKind::BiAllelicHardCalls,
            sample_count,
            vec![DataTrack::hard_calls(hard_calls)],
        ))
    }

    /// The dosage track always carries one value per sample, whatever its hard call.
    pub fn bi_allelic_with_dosages(hard_calls: Vec<u8>, dosages: &[f32]) -> Result<Self, PgenError> {
        if dosages.len() != hard_calls.len() {
            return Err(PgenError::MalformedValues {
                expected: hard_calls.len(),
                found: dosages.len(),
            });
        }
        check_hard_calls(&hard_calls)?;
        let sample_count = hard_calls.len();
        let fixed_point = dosages.iter().map(|&d| dosage_to_fixed_point(d)).collect();
        Ok(Self::assemble(
            RecordKind::BiAllelicHardCallsAndDosages,
            sample_count,
            vec![DataTrack::hard_calls(hard_calls), DataTrack::dosages(fixed_point)],
        ))
    }

    pub fn multi_allelic(
        alleles: &AllelePairs,
        hard_calls: Vec<u8>,
        alt_alleles: usize,
    ) -> Result<Self, PgenError> {
        if alleles.first.len() != hard_calls.len() || alleles.second.len() != hard_calls.len() {
            return Err(PgenError::MalformedValues {
                expected: hard_calls.len(),
                found: alleles.first.len().min(alleles.second.len()),
            });
        }
        check_allele_pairs(alleles, &hard_calls, alt_alleles)?;
        let sample_count = hard_calls.len();
        let patch = patch_tracks(alleles, &hard_calls, alt_alleles);
        let mut tracks = Vec::with_capacity(1 + patch.len());
        tracks.push(DataTrack::hard_calls(hard_calls));
        tracks.extend(patch);
        Ok(Self::assemble(
            RecordKind::MultiAllelicHardCalls { alt_alleles },
            sample_count,
            tracks,
        ))
    }

    fn assemble(kind: RecordKind, sample_count: usize, tracks: Vec<DataTrack>) -> Self {
        Self {
            kind,
            sample_count,
            tracks,
            current: 0,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn storage_type(&self) -> u8 {
        self.kind.storage_type()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn tracks(&self) -> &[DataTrack] {
        &self.tracks
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.tracks.len()
    }

    /// Total serialized bytes across all tracks.
    pub fn serialized_len(&self) -> usize {
        self.tracks.iter().map(DataTrack::serialized_len).sum()
    }

    /// Drains the tracks left to right into `window`. A track that finishes mid-window
    /// hands the rest of the window to the next track within the same call.
    pub fn write(&mut self, window: &mut [u8]) -> Progress {
        let mut written = 0;
        while let Some(track) = self.tracks.get_mut(self.current) {
            let progress = track.write(&mut window[written..]);
            written += progress.written;
            if !progress.done {
                return Progress {
                    written,
                    done: false,
                };
            }
            self.current += 1;
        }
        Progress {
            written,
            done: true,
        }
    }
}

fn check_hard_calls(hard_calls: &[u8]) -> Result<(), PgenError> {
    match hard_calls.iter().position(|&code| code > MISSING) {
        Some(index) => Err(PgenError::InvalidHardCall {
            index,
            code: hard_calls[index],
        }),
        None => Ok(()),
    }
}

/// Each pair is either fully missing or ordered and within `0..=alt_alleles`, and each hard
/// call is the one its pair implies.
fn check_allele_pairs(
    alleles: &AllelePairs,
    hard_calls: &[u8],
    alt_alleles: usize,
) -> Result<(), PgenError> {
    let highest = i64::try_from(alt_alleles).unwrap_or(i64::MAX);
    for (index, ((&first, &second), &found)) in alleles
        .first
        .iter()
        .zip(&alleles.second)
        .zip(hard_calls)
        .enumerate()
    {
        let missing = first == MISSING_ALLELE && second == MISSING_ALLELE;
        let ordered = 0 <= first && first <= second && i64::from(second) <= highest;
        if !missing && !ordered {
            return Err(PgenError::InvalidAllelePair {
                index,
                first,
                second,
                alt_alleles,
            });
        }
        let expected = values::hard_call(first, second);
        if found != expected {
            return Err(PgenError::HardCallMismatch {
                index,
                found,
                expected,
            });
        }
    }
    Ok(())
}

/// Converts a dosage to `round(dosage * 16384)`, clamped into an unsigned 16-bit field.
pub fn dosage_to_fixed_point(dosage: f32) -> u16 {
    let scaled = (dosage * DOSAGE_SCALE).round();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else if scaled >= u16::MAX as f32 {
        u16::MAX
    } else {
        scaled as u16
    }
}

/// Width of category-1 values (`allele - 2`), by number of alternate alleles.
pub fn category1_width(alt_alleles: usize) -> BitWidth {
    match alt_alleles {
        0..=3 => BitWidth::One,
        4..=5 => BitWidth::Two,
        6..=17 => BitWidth::Four,
        18..=257 => BitWidth::Eight,
        258..=65_537 => BitWidth::Sixteen,
        _ => BitWidth::TwentyFour,
    }
}

/// Width of category-2 values (`allele - 1`, packed as pairs), by number of alternate
/// alleles. Never narrower than 2 bits.
pub fn category2_width(alt_alleles: usize) -> BitWidth {
    match alt_alleles {
        0..=4 => BitWidth::Two,
        5..=16 => BitWidth::Four,
        17..=256 => BitWidth::Eight,
        257..=65_536 => BitWidth::Sixteen,
        _ => BitWidth::TwentyFour,
    }
}

fn patch_tracks(alleles: &AllelePairs, hard_calls: &[u8], alt_alleles: usize) -> Vec<DataTrack> {
    let mut het_flags = Vec::new();
    let mut hom_flags = Vec::new();
    let mut het_patches = Vec::new();
    let mut hom_patches = Vec::new();

    for (i, &call) in hard_calls.iter().enumerate() {
        let first = alleles.first[i];
        let second = alleles.second[i];
        let needs_patch = second > 1;
        match call {
            HET => {
                het_flags.push(needs_patch);
                if needs_patch {
                    het_patches.push((second - 2) as u32);
                }
            }
            HOM_ALT => {
                hom_flags.push(needs_patch);
                if needs_patch {
                    hom_patches.push((first, second));
                }
            }
            _ => {}
        }
    }

    let mut summary = 0u8;
    if het_patches.is_empty() {
        summary |= 0x0F;
    }
    if hom_patches.is_empty() {
        summary |= 0xF0;
    }

    let mut tracks = vec![DataTrack::single_byte(summary)];

    if !het_patches.is_empty() {
        tracks.push(DataTrack::flags(het_flags));
        if alt_alleles > 2 {
            tracks.push(DataTrack::packed(het_patches, category1_width(alt_alleles)));
        }
    }

    if !hom_patches.is_empty() {
        tracks.push(DataTrack::flags(hom_flags));
        if alt_alleles == 2 {
            let both_second_alt = hom_patches.iter().map(|&(first, _)| first == 2).collect();
            tracks.push(DataTrack::flags(both_second_alt));
        } else if alt_alleles > 2 {
            let pairs = hom_patches
                .iter()
                .flat_map(|&(first, second)| [(first - 1) as u32, (second - 1) as u32])
                .collect();
            tracks.push(DataTrack::packed(pairs, category2_width(alt_alleles)));
        }
    }

    tracks
}
