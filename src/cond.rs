//! Ternary input-condition matching.
//!
//! A condition is a pattern over `{'0', '1', '-'}` with one character per
//! input bit, leftmost character first (most significant bit). A `'-'` marks
//! a don't-care position that never constrains the match.

/// A parsed ternary condition pattern.
///
/// Matching is a single mask-and-compare: `care` has a 1 at every position
/// that carries a literal `0` or `1`, and `value` holds those literal bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TernaryPattern {
    care: u64,
    value: u64,
    width: u32,
}

impl TernaryPattern {
    /// Parse a pattern of exactly `input_w` characters.
    ///
    /// Returns a human-readable reason on failure; the caller wraps it with
    /// the offending state index.
    pub fn parse(pattern: &str, input_w: u32) -> Result<Self, String> {
        let len = pattern.chars().count();
        if len != input_w as usize {
            return Err(format!(
                "expected {input_w} characters, found {len}"
            ));
        }

        let mut care = 0u64;
        let mut value = 0u64;
        for c in pattern.chars() {
            care <<= 1;
            value <<= 1;
            match c {
                '0' => care |= 1,
                '1' => {
                    care |= 1;
                    value |= 1;
                }
                '-' => {}
                other => {
                    return Err(format!(
                        "invalid character {other:?}, expected '0', '1' or '-'"
                    ))
                }
            }
        }

        Ok(Self {
            care,
            value,
            width: input_w,
        })
    }

    /// True iff every non-don't-care position of the pattern equals the
    /// corresponding bit of `input`.
    pub fn matches(&self, input: u64) -> bool {
        input & self.care == self.value
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_bits_constrain_the_match() {
        let p = TernaryPattern::parse("10", 2).unwrap();
        assert!(p.matches(0b10));
        assert!(!p.matches(0b00));
        assert!(!p.matches(0b01));
        assert!(!p.matches(0b11));
    }

    #[test]
    fn dont_care_positions_are_ignored() {
        let p = TernaryPattern::parse("--10", 4).unwrap();
        for high in 0..4u64 {
            assert!(p.matches(high << 2 | 0b10));
            assert!(!p.matches(high << 2 | 0b01));
        }
    }

    #[test]
    fn all_dont_care_matches_everything() {
        let p = TernaryPattern::parse("---", 3).unwrap();
        for x in 0..8 {
            assert!(p.matches(x));
        }
    }

    // Exhaustive form of the matcher contract: a pattern matches iff every
    // constrained position agrees with the input bit.
    #[test]
    fn matches_agrees_with_per_position_definition() {
        let patterns = ["000", "111", "0-1", "--:", "1--", "-0-"];
        for pattern in patterns {
            let Ok(p) = TernaryPattern::parse(pattern, 3) else {
                continue; // "--:" is rejected by parse
            };
            for x in 0..8u64 {
                let expected = pattern.chars().enumerate().all(|(pos, c)| {
                    let bit = x >> (2 - pos) & 1;
                    match c {
                        '0' => bit == 0,
                        '1' => bit == 1,
                        _ => true,
                    }
                });
                assert_eq!(p.matches(x), expected, "{pattern} vs {x:03b}");
            }
        }
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(TernaryPattern::parse("10", 4).is_err());
        assert!(TernaryPattern::parse("10101", 4).is_err());
        assert!(TernaryPattern::parse("", 1).is_err());
    }

    #[test]
    fn bad_characters_are_rejected() {
        assert!(TernaryPattern::parse("1x", 2).is_err());
        assert!(TernaryPattern::parse("2-", 2).is_err());
    }
}
