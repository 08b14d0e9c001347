// ========================================================================================
//
//                              Genotype value-column parsing
//
// ========================================================================================
//
// Turns the text value columns carried by input rows into per-sample arrays:
//   - hard-call columns hold one digit per sample: 0 hom-ref, 1 het, 2 hom-alt, 3 missing;
//   - imputed columns hold two printable characters per sample, each encoding one
//     genotype probability as (126 - c) / 93.

use crate::error::PgenError;

pub const HOM_REF: u8 = 0;
pub const HET: u8 = 1;
pub const HOM_ALT: u8 = 2;
pub const MISSING: u8 = 3;

/// Allele index stored for a missing call.
pub const MISSING_ALLELE: i32 = -1;

/// Per-sample allele index pairs for one multi-allelic site. Index 0 is the reference
/// allele, `k` is the k-th alternate allele. `second` holds the higher index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllelePairs {
    pub first: Vec<i32>,
    pub second: Vec<i32>,
}

impl AllelePairs {
    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    /// Collapses each pair into its hard call relative to the first alternate allele.
    pub fn hard_calls(&self) -> Vec<u8> {
        self.first
            .iter()
            .zip(&self.second)
            .map(|(&a, &b)| hard_call(a, b))
            .collect()
    }
}

/// The hard call of one allele pair relative to the first alternate allele.
pub fn hard_call(first: i32, second: i32) -> u8 {
    match first {
        0 if second == 0 => HOM_REF,
        0 => HET,
        MISSING_ALLELE => MISSING,
        _ => HOM_ALT,
    }
}

/// Parses a hard-call column, one digit per sample.
pub fn parse_hard_calls(values: &str) -> Result<Vec<u8>, PgenError> {
    values
        .bytes()
        .enumerate()
        .map(|(index, b)| match b {
            b'0'..=b'3' => Ok(b - b'0'),
            other => Err(PgenError::InvalidGenotype {
                index,
                found: other as char,
            }),
        })
        .collect()
}

/// Combines the hard-call columns of several single-ALT rows at one site. Column `k`
/// describes alternate allele `k + 1`. Columns are applied from last to first so that the
/// higher allele index of a heterozygote lands in `second`. Once a sample is missing in
/// any column it stays missing.
pub fn merge_allele_columns(columns: &[Vec<u8>]) -> Result<AllelePairs, PgenError> {
    let sample_count = columns.first().map_or(0, Vec::len);
    let mut first = vec![0i32; sample_count];
    let mut second = vec![0i32; sample_count];

    for (column_idx, column) in columns.iter().enumerate().rev() {
        if column.len() != sample_count {
            return Err(PgenError::MalformedValues {
                expected: sample_count,
                found: column.len(),
            });
        }
        let allele = column_idx as i32 + 1;
        for (i, &call) in column.iter().enumerate() {
            if first[i] == MISSING_ALLELE {
                continue;
            }
            match call {
                HOM_REF => {}
                HET => {
                    if second[i] == 0 {
                        second[i] = allele;
                    } else {
                        first[i] = allele;
                    }
                }
                HOM_ALT => {
                    first[i] = allele;
                    second[i] = allele;
                }
                _ => {
                    first[i] = MISSING_ALLELE;
                    second[i] = MISSING_ALLELE;
                }
            }
        }
    }

    Ok(AllelePairs { first, second })
}

/// Hard calls and dosages recovered from an imputed probability column.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputedCalls {
    pub hard_calls: Vec<u8>,
    pub dosages: Vec<f32>,
}

/// Parses an imputed column. A sample's hard call is the first of hom-ref, het and hom-alt
/// whose probability exceeds `threshold`, or missing if none does. A pair of blanks marks
/// a sample with no data at all.
pub fn parse_imputed(values: &str, threshold: f32) -> Result<ImputedCalls, PgenError> {
    let bytes = values.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(PgenError::MalformedValues {
            expected: bytes.len() / 2 + 1,
            found: bytes.len() / 2,
        });
    }

    let sample_count = bytes.len() / 2;
    let mut hard_calls = Vec::with_capacity(sample_count);
    let mut dosages = Vec::with_capacity(sample_count);

    for pair in bytes.chunks_exact(2) {
        if pair == b"  " {
            hard_calls.push(MISSING);
            dosages.push(0.0);
            continue;
        }
        let p1 = probability_from_char(pair[0]);
        let p2 = probability_from_char(pair[1]);
        let p0 = 1.0 - p1 - p2;
        dosages.push(p1 + 2.0 * p2);
        hard_calls.push(if p0 > threshold {
            HOM_REF
        } else if p1 > threshold {
            HET
        } else if p2 > threshold {
            HOM_ALT
        } else {
            MISSING
        });
    }

    Ok(ImputedCalls {
        hard_calls,
        dosages,
    })
}

#[inline]
fn probability_from_char(c: u8) -> f32 {
    (126.0 - c as f32) / 93.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_call_digits_map_directly() {
        assert_eq!(parse_hard_calls("0123").unwrap(), vec![0, 1, 2, 3]);
        assert!(parse_hard_calls("").unwrap().is_empty());
    }

    #[test]
    fn invalid_hard_call_reports_position() {
        match parse_hard_calls("01x") {
            Err(PgenError::InvalidGenotype { index, found }) => {
                assert_eq!(index, 2);
                assert_eq!(found, 'x');
            }
            other => panic!("expected InvalidGenotype, got {other:?}"),
        }
    }

    #[test]
    fn three_columns_merge_into_sorted_pairs() {
        let columns = vec![
            parse_hard_calls("01010103").unwrap(),
            parse_hard_calls("00110013").unwrap(),
            parse_hard_calls("00001113").unwrap(),
        ];
        let pairs = merge_allele_columns(&columns).unwrap();
        assert_eq!(pairs.first, vec![0, 0, 0, 1, 0, 1, 2, -1]);
        assert_eq!(pairs.second, vec![0, 1, 2, 2, 3, 3, 3, -1]);
        assert_eq!(pairs.hard_calls(), vec![0, 1, 1, 2, 1, 2, 2, 3]);
    }

    #[test]
    fn missing_in_a_later_column_stays_missing() {
        let columns = vec![parse_hard_calls("1").unwrap(), parse_hard_calls("3").unwrap()];
        let pairs = merge_allele_columns(&columns).unwrap();
        assert_eq!(pairs.first, vec![MISSING_ALLELE]);
        assert_eq!(pairs.hard_calls(), vec![MISSING]);
    }

    #[test]
    fn hom_alt_column_sets_both_alleles() {
        let columns = vec![parse_hard_calls("0").unwrap(), parse_hard_calls("2").unwrap()];
        let pairs = merge_allele_columns(&columns).unwrap();
        assert_eq!((pairs.first[0], pairs.second[0]), (2, 2));
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let columns = vec![vec![0, 1], vec![0]];
        assert!(matches!(
            merge_allele_columns(&columns),
            Err(PgenError::MalformedValues { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn imputed_probabilities_pick_hard_calls() {
        // '~' encodes probability 0, '!' encodes probability 1.
        let calls = parse_imputed("~~!~~!  ", 0.9).unwrap();
        assert_eq!(calls.hard_calls, vec![HOM_REF, HET, HOM_ALT, MISSING]);
        assert_eq!(calls.dosages, vec![0.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn odd_length_imputed_column_is_rejected() {
        assert!(parse_imputed("~~~", 0.5).is_err());
    }
}
