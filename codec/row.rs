// ========================================================================================
//
//                                      Input rows
//
// ========================================================================================

use crate::error::PgenError;
use memchr::memchr_iter;

/// A sorted genotype input row. Column 0 is the chromosome and column 1 the position; the
/// remaining columns are addressed by index and only read, never validated.
pub trait GenotypeRow {
    fn chromosome(&self) -> &str;

    fn position(&self) -> u64;

    fn column(&self, index: usize) -> Option<&str>;

    fn require(&self, index: usize) -> Result<&str, PgenError> {
        self.column(index)
            .ok_or(PgenError::MissingColumn { index })
    }
}

/// One tab-separated line, split once into column bounds.
#[derive(Debug, Clone)]
pub struct TabRow {
    line: String,
    bounds: Vec<(usize, usize)>,
    position: u64,
}

impl TabRow {
    pub fn parse(line: impl Into<String>) -> Result<Self, PgenError> {
        let mut line = line.into();
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);

        let bytes = line.as_bytes();
        let mut bounds = Vec::with_capacity(8);
        let mut start = 0;
        for tab in memchr_iter(b'\t', bytes) {
            bounds.push((start, tab));
            start = tab + 1;
        }
        bounds.push((start, bytes.len()));

        let &(pos_start, pos_end) = bounds.get(1).ok_or(PgenError::MissingColumn { index: 1 })?;
        let position = lexical_core::parse::<u64>(&bytes[pos_start..pos_end]).map_err(|_| {
            PgenError::InvalidPosition {
                value: line[pos_start..pos_end].to_string(),
            }
        })?;

        Ok(Self {
            line,
            bounds,
            position,
        })
    }

    pub fn column_count(&self) -> usize {
        self.bounds.len()
    }
}

impl GenotypeRow for TabRow {
    fn chromosome(&self) -> &str {
        let (start, end) = self.bounds[0];
        &self.line[start..end]
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn column(&self, index: usize) -> Option<&str> {
        self.bounds
            .get(index)
            .map(|&(start, end)| &self.line[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_split_on_tabs() {
        let row = TabRow::parse("chr1\t12345\tA\tC\trs1\t0123\n").unwrap();
        assert_eq!(row.chromosome(), "chr1");
        assert_eq!(row.position(), 12345);
        assert_eq!(row.column(2), Some("A"));
        assert_eq!(row.column(5), Some("0123"));
        assert_eq!(row.column(6), None);
        assert_eq!(row.column_count(), 6);
    }

    #[test]
    fn empty_columns_are_kept() {
        let row = TabRow::parse("chr2\t7\t\tG").unwrap();
        assert_eq!(row.column(2), Some(""));
        assert_eq!(row.column(3), Some("G"));
    }

    #[test]
    fn require_reports_the_missing_index() {
        let row = TabRow::parse("chr1\t1\tA").unwrap();
        assert!(matches!(row.require(4), Err(PgenError::MissingColumn { index: 4 })));
    }

    #[test]
    fn bad_positions_are_rejected() {
        assert!(matches!(
            TabRow::parse("chr1\tabc\tA"),
            Err(PgenError::InvalidPosition { .. })
        ));
        assert!(matches!(
            TabRow::parse("chr1"),
            Err(PgenError::MissingColumn { index: 1 })
        ));
    }
}
