// ========================================================================================
//
//                               Bit-packing primitives
//
// ========================================================================================
//
// Allocation-free packers, one per output width. Each one fills as many output bytes as
// fit in `dst` from the elements of `src`, least-significant group first, and returns the
// number of bytes written. A trailing partial byte (sub-byte widths only) is emitted only
// if there is room for it, with the unused high-order bits left zero. Multi-byte widths
// never split a value across calls.
//
// "Done" is not signalled here. Callers compare the consumed element count (see
// `BitWidth::consumed`) against their source length.

/// Packs values at 1 bit each, 8 per byte.
pub fn pack_1bit<T: Copy + Into<u32>>(dst: &mut [u8], src: &[T]) -> usize {
    pack_sub_byte(dst, src, 1)
}

/// Packs booleans at 1 bit each. Identical layout to `pack_1bit`.
pub fn pack_bools(dst: &mut [u8], src: &[bool]) -> usize {
    pack_sub_byte(dst, src, 1)
}

/// Packs values at 2 bits each, 4 per byte.
pub fn pack_2bit<T: Copy + Into<u32>>(dst: &mut [u8], src: &[T]) -> usize {
    pack_sub_byte(dst, src, 2)
}

/// Packs values at 4 bits each, 2 per byte.
pub fn pack_4bit<T: Copy + Into<u32>>(dst: &mut [u8], src: &[T]) -> usize {
    pack_sub_byte(dst, src, 4)
}

pub fn pack_8bit<T: Copy + Into<u32>>(dst: &mut [u8], src: &[T]) -> usize {
    let mut written = 0;
    for (slot, &value) in dst.iter_mut().zip(src) {
        *slot = value.into() as u8;
        written += 1;
    }
    written
}

/// Packs values as little-endian 16-bit words.
pub fn pack_16bit<T: Copy + Into<u32>>(dst: &mut [u8], src: &[T]) -> usize {
    pack_whole_bytes::<T, 2>(dst, src)
}

/// Packs values as little-endian 24-bit words.
pub fn pack_24bit<T: Copy + Into<u32>>(dst: &mut [u8], src: &[T]) -> usize {
    pack_whole_bytes::<T, 3>(dst, src)
}

#[inline]
fn pack_sub_byte<T: Copy + Into<u32>>(dst: &mut [u8], src: &[T], width: u32) -> usize {
    let per_byte = (8 / width) as usize;
    let mask = (1u32 << width) - 1;
    let mut written = 0;
    for (slot, group) in dst.iter_mut().zip(src.chunks(per_byte)) {
        let mut byte = 0u32;
        for (shift, &value) in group.iter().enumerate() {
            byte |= (value.into() & mask) << (shift as u32 * width);
        }
        *slot = byte as u8;
        written += 1;
    }
    written
}

#[inline]
fn pack_whole_bytes<T: Copy + Into<u32>, const N: usize>(dst: &mut [u8], src: &[T]) -> usize {
    let mut written = 0;
    for (slot, &value) in dst.chunks_exact_mut(N).zip(src) {
        slot.copy_from_slice(&value.into().to_le_bytes()[..N]);
        written += N;
    }
    written
}

/// The output widths a data track can be packed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitWidth {
    One,
    Two,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
}

impl BitWidth {
    pub const ALL: [BitWidth; 6] = [
        BitWidth::One,
        BitWidth::Two,
        BitWidth::Four,
        BitWidth::Eight,
        BitWidth::Sixteen,
        BitWidth::TwentyFour,
    ];

    pub fn bits(self) -> usize {
        match self {
            BitWidth::One => 1,
            BitWidth::Two => 2,
            BitWidth::Four => 4,
            BitWidth::Eight => 8,
            BitWidth::Sixteen => 16,
            BitWidth::TwentyFour => 24,
        }
    }

    /// Dispatches to the packer for this width.
    pub fn pack<T: Copy + Into<u32>>(self, dst: &mut [u8], src: &[T]) -> usize {
        match self {
            BitWidth::One => pack_1bit(dst, src),
            BitWidth::Two => pack_2bit(dst, src),
            BitWidth::Four => pack_4bit(dst, src),
            BitWidth::Eight => pack_8bit(dst, src),
            BitWidth::Sixteen => pack_16bit(dst, src),
            BitWidth::TwentyFour => pack_24bit(dst, src),
        }
    }

    /// How many source elements a pack call consumed, given the bytes it wrote and the
    /// number of elements that were available. Sub-byte widths may end on a partial byte,
    /// so the count saturates at `available`.
    pub fn consumed(self, bytes_written: usize, available: usize) -> usize {
        match self {
            BitWidth::One | BitWidth::Two | BitWidth::Four => {
                (bytes_written * (8 / self.bits())).min(available)
            }
            BitWidth::Eight => bytes_written,
            BitWidth::Sixteen => bytes_written / 2,
            BitWidth::TwentyFour => bytes_written / 3,
        }
    }

    /// Total bytes needed to pack `count` elements at this width.
    pub fn packed_len(self, count: usize) -> usize {
        (count * self.bits()).div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpack(width: BitWidth, bytes: &[u8], count: usize) -> Vec<u32> {
        let bits = width.bits();
        (0..count)
            .map(|i| {
                if bits >= 8 {
                    let step = bits / 8;
                    let mut word = [0u8; 4];
                    word[..step].copy_from_slice(&bytes[i * step..(i + 1) * step]);
                    u32::from_le_bytes(word)
                } else {
                    let per_byte = 8 / bits;
                    let byte = bytes[i / per_byte] as u32;
                    (byte >> ((i % per_byte) * bits)) & ((1 << bits) - 1)
                }
            })
            .collect()
    }

    fn sample_values(width: BitWidth, count: usize) -> Vec<u32> {
        let modulus = 1u64 << width.bits();
        (0..count as u64)
            .map(|i| ((i * 2_654_435_761) % modulus) as u32)
            .collect()
    }

    #[test]
    fn every_width_round_trips_from_every_offset() {
        let count = 37;
        for width in BitWidth::ALL {
            let values = sample_values(width, count);
            for start in 0..=count {
                let tail = &values[start..];
                let mut out = vec![0u8; width.packed_len(tail.len())];
                let written = width.pack(&mut out, tail);
                assert_eq!(written, out.len(), "width {width:?} start {start}");
                assert_eq!(unpack(width, &out, tail.len()), tail, "width {width:?}");
                assert_eq!(width.consumed(written, tail.len()), tail.len());
            }
        }
    }

    #[test]
    fn hard_calls_pack_lsb_pair_first() {
        let mut out = [0u8; 1];
        assert_eq!(pack_2bit(&mut out, &[0u8, 1, 2, 3]), 1);
        assert_eq!(out[0], 0xE4);
    }

    #[test]
    fn partial_trailing_byte_is_zero_padded() {
        let mut out = [0xFFu8; 2];
        assert_eq!(pack_2bit(&mut out, &[3u8, 3, 3, 3, 1]), 2);
        assert_eq!(out, [0xFF, 0x01]);

        let mut flags = [0xFFu8; 1];
        assert_eq!(pack_bools(&mut flags, &[false, true, true]), 1);
        assert_eq!(flags[0], 0x06);
    }

    #[test]
    fn packing_stops_at_the_window_end() {
        let values: Vec<u8> = vec![1; 20];
        let mut out = [0u8; 3];
        let written = pack_2bit(&mut out, &values);
        assert_eq!(written, 3);
        assert_eq!(BitWidth::Two.consumed(written, values.len()), 12);
        assert_eq!(out, [0x55; 3]);
    }

    #[test]
    fn wide_values_are_never_split() {
        let mut out = [0u8; 5];
        assert_eq!(pack_16bit(&mut out, &[0x1234u16, 0x5678, 0x9ABC]), 4);
        assert_eq!(&out[..4], &[0x34, 0x12, 0x78, 0x56]);

        let mut out = [0u8; 5];
        assert_eq!(pack_24bit(&mut out, &[0x0001_BAu32, 7]), 3);
        assert_eq!(&out[..3], &[0xBA, 0x01, 0x00]);
        assert_eq!(BitWidth::TwentyFour.consumed(3, 2), 1);
    }

    #[test]
    fn empty_window_writes_nothing() {
        let mut out: [u8; 0] = [];
        for width in BitWidth::ALL {
            assert_eq!(width.pack(&mut out, &[1u32, 0, 1]), 0);
        }
    }
}
