pub const BITS_PER_BYTE: u32 = 8;

/// Number of bits needed to represent `n` (0 needs 0 bits).
pub fn bits_required(n: u64) -> u32 {
    u64::BITS - n.leading_zeros()
}

/// All-ones mask of the given width, saturating at 128 bits.
pub fn mask(width: u32) -> u128 {
    if width >= u128::BITS {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// Format `value` as a binary string zero padded to `width` digits,
/// most significant bit first.
pub fn to_binary_string(value: u64, width: u32) -> String {
    (0..width)
        .rev()
        .map(|b| if value >> b & 1 == 1 { '1' } else { '0' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_required_boundaries() {
        assert_eq!(bits_required(0), 0);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(3), 2);
        assert_eq!(bits_required(4), 3);
        assert_eq!(bits_required(u64::MAX), 64);
    }

    #[test]
    fn mask_widths() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(1), 1);
        assert_eq!(mask(32), 0xffff_ffff);
        assert_eq!(mask(128), u128::MAX);
    }

    #[test]
    fn binary_string_is_padded() {
        assert_eq!(to_binary_string(0b10, 4), "0010");
        assert_eq!(to_binary_string(0, 3), "000");
        assert_eq!(to_binary_string(0b101, 3), "101");
    }
}
