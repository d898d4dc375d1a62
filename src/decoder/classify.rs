//! Word classification by masked comparison against ordered tag tables

use super::common::RawWord;

/// One entry of a classification table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRule<K> {
    pub mask: u32,
    pub pattern: u32,
    pub kind: K,
}

impl<K: Copy> WordRule<K> {
    pub const fn new(mask: u32, pattern: u32, kind: K) -> Self {
        Self {
            mask,
            pattern,
            kind,
        }
    }

    #[inline]
    pub fn matches(&self, word: RawWord) -> bool {
        word & self.mask == self.pattern
    }
}

/// Classify a word against an ordered rule table
///
/// The first matching rule wins; `default` is returned when nothing matches,
/// so every 32-bit input has a kind.
#[inline]
pub fn classify<K: Copy>(word: RawWord, rules: &[WordRule<K>], default: K) -> K {
    rules
        .iter()
        .find(|rule| rule.matches(word))
        .map_or(default, |rule| rule.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        A,
        B,
        Other,
    }

    const RULES: [WordRule<Kind>; 3] = [
        WordRule::new(0xF000_0000, 0x1000_0000, Kind::A),
        WordRule::new(0xF000_0000, 0x2000_0000, Kind::B),
        // Shadowed by the first rule for 0x1xxx_xxxx words
        WordRule::new(0x1000_0000, 0x1000_0000, Kind::B),
    ];

    #[test]
    fn test_first_match_wins() {
        assert_eq!(classify(0x1234_5678, &RULES, Kind::Other), Kind::A);
    }

    #[test]
    fn test_second_rule() {
        assert_eq!(classify(0x2000_0000, &RULES, Kind::Other), Kind::B);
    }

    #[test]
    fn test_default_on_no_match() {
        assert_eq!(classify(0x4000_0000, &RULES, Kind::Other), Kind::Other);
        assert_eq!(classify(0x0, &[], Kind::Other), Kind::Other);
    }

    #[test]
    fn test_later_rule_reached_when_earlier_miss() {
        // 0x3... misses the exact nibble rules, hits the single-bit rule
        assert_eq!(classify(0x3000_0000, &RULES, Kind::Other), Kind::B);
    }
}
