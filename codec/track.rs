// ========================================================================================
//
//                                 Resumable data tracks
//
// ========================================================================================
//
// A data track is one bit-packed component of a variant record's serialized form. Tracks
// are drained through caller-owned windows of arbitrary size: each `write` call packs as
// much as fits and reports whether the track is exhausted, so a container can push an
// unbounded sequence of variants through one fixed buffer without allocating per call.

use crate::bits::BitWidth;

/// The outcome of one `write` call on a track or record.
///
/// `done` is true once the producer has emitted its final byte, whether or not the window
/// was filled. When `done` is false the window was filled as far as the producer could
/// fill it, and the caller must come back with a fresh window for the same producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub written: usize,
    pub done: bool,
}

#[derive(Debug, Clone)]
enum TrackValues {
    Flags(Vec<bool>),
    Bytes(Vec<u8>),
    Words(Vec<u16>),
    Ints(Vec<u32>),
}

impl TrackValues {
    fn len(&self) -> usize {
        match self {
            TrackValues::Flags(v) => v.len(),
            TrackValues::Bytes(v) => v.len(),
            TrackValues::Words(v) => v.len(),
            TrackValues::Ints(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataTrack {
    values: TrackValues,
    width: BitWidth,
    cursor: usize,
}

impl DataTrack {
    /// The main track: one 2-bit hard-call code per sample.
    pub fn hard_calls(codes: Vec<u8>) -> Self {
        Self::new(TrackValues::Bytes(codes), BitWidth::Two)
    }

    /// One 16-bit fixed-point dosage per sample.
    pub fn dosages(fixed_point: Vec<u16>) -> Self {
        Self::new(TrackValues::Words(fixed_point), BitWidth::Sixteen)
    }

    pub fn flags(flags: Vec<bool>) -> Self {
        Self::new(TrackValues::Flags(flags), BitWidth::One)
    }

    pub fn packed(values: Vec<u32>, width: BitWidth) -> Self {
        Self::new(TrackValues::Ints(values), width)
    }

    /// A track holding exactly one byte.
    pub fn single_byte(byte: u8) -> Self {
        Self::new(TrackValues::Bytes(vec![byte]), BitWidth::Eight)
    }

    fn new(values: TrackValues, width: BitWidth) -> Self {
        Self {
            values,
            width,
            cursor: 0,
        }
    }

    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// Number of elements carried by this track.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.values.len()
    }

    /// Bytes this track emits in total, independent of how it is drained.
    pub fn serialized_len(&self) -> usize {
        self.width.packed_len(self.values.len())
    }

    pub fn write(&mut self, window: &mut [u8]) -> Progress {
        let from = self.cursor;
        let written = match &self.values {
            TrackValues::Flags(v) => self.width.pack(window, &v[from..]),
            TrackValues::Bytes(v) => self.width.pack(window, &v[from..]),
            TrackValues::Words(v) => self.width.pack(window, &v[from..]),
            TrackValues::Ints(v) => self.width.pack(window, &v[from..]),
        };
        let available = self.values.len() - from;
        self.cursor += self.width.consumed(written, available);
        Progress {
            written,
            done: self.is_done(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dosage_track_resumes_on_whole_values() {
        let mut track = DataTrack::dosages(vec![0x4000, 0x8000, 0x0001]);
        let mut window = [0u8; 3];

        let first = track.write(&mut window);
        assert_eq!(first, Progress { written: 2, done: false });
        assert_eq!(&window[..2], &[0x00, 0x40]);

        let second = track.write(&mut window);
        assert_eq!(second, Progress { written: 2, done: false });
        assert_eq!(&window[..2], &[0x00, 0x80]);

        let last = track.write(&mut window);
        assert_eq!(last, Progress { written: 2, done: true });
        assert_eq!(&window[..2], &[0x01, 0x00]);
    }

    #[test]
    fn empty_window_makes_no_progress() {
        let mut track = DataTrack::hard_calls(vec![1]);
        let progress = track.write(&mut []);
        assert_eq!(progress, Progress { written: 0, done: false });
        assert!(!track.is_done());
    }

    #[test]
    fn exhausted_track_reports_done_with_zero_bytes() {
        let mut track = DataTrack::flags(Vec::new());
        assert!(track.is_done());
        let progress = track.write(&mut [0u8; 4]);
        assert_eq!(progress, Progress { written: 0, done: true });
    }

    #[test]
    fn serialized_len_accounts_for_partial_bytes() {
        assert_eq!(DataTrack::hard_calls(vec![0; 5]).serialized_len(), 2);
        assert_eq!(DataTrack::flags(vec![true; 9]).serialized_len(), 2);
        assert_eq!(DataTrack::packed(vec![1, 2], BitWidth::TwentyFour).serialized_len(), 6);
        assert_eq!(DataTrack::single_byte(0xF0).serialized_len(), 1);
    }
}
