//! Deterministic mapping from a period identifier to its outcome.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::PeriodId;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const MIX_A: u32 = 0x85eb_ca6b;
const MIX_B: u32 = 0xc2b2_ae35;

/// Values at or above this are [`Category::Big`].
const BIG_THRESHOLD: u8 = 5;

/// Salted 32-bit FNV-1a over `bytes`, finished with a murmur-style
/// avalanche so neighbouring inputs land far apart.
pub fn mix32<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> u32 {
    let mut hash = bytes.into_iter().fold(FNV_OFFSET, |acc, &b| {
        (acc ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    });

    hash ^= hash >> 16;
    hash = hash.wrapping_mul(MIX_A);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(MIX_B);
    hash ^= hash >> 16;
    hash
}

/// Binary classification of a period's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Big,
    Small,
}

impl Category {
    pub const fn of(value: u8) -> Self {
        if value >= BIG_THRESHOLD {
            Self::Big
        } else {
            Self::Small
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Big => write!(f, "BIG"),
            Self::Small => write!(f, "SMALL"),
        }
    }
}

/// Auxiliary tag attached to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Red,
    Green,
    Violet,
}

impl Tone {
    /// Hex colour the tone is rendered with.
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Red => "#ff0000",
            Self::Green => "#00ff00",
            Self::Violet => "#9c27b0",
        }
    }

    /// Ordered tags for a value in `0..=9`.
    pub fn for_value(value: u8) -> Vec<Self> {
        match value {
            0 => vec![Self::Red, Self::Violet],
            5 => vec![Self::Green, Self::Violet],
            1 | 3 | 7 | 9 => vec![Self::Green],
            _ => vec![Self::Red],
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Violet => "Violet",
        };
        write!(f, "{s}")
    }
}

/// Everything derived from one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOutcome {
    pub period: String,
    /// Raw mapped output in `0..=9`.
    pub value: u8,
    pub category: Category,
    pub tags: Vec<Tone>,
    /// Rises with distance from the distribution midpoint; `85..=99`.
    pub confidence: u8,
}

impl PeriodOutcome {
    /// Human label for the tags, e.g. `"Red + Violet"`.
    pub fn tag_label(&self) -> String {
        self.tags
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Pure function from period to outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeGenerator {
    salt: String,
}

impl Default for OutcomeGenerator {
    fn default() -> Self {
        Self::new(keygate_core::OutcomeConfig::default().salt)
    }
}

impl OutcomeGenerator {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn from_config(config: &keygate_core::OutcomeConfig) -> Self {
        Self::new(config.salt.clone())
    }

    /// Outcome for an arbitrary period string. Total over all inputs.
    pub fn generate(&self, period: &str) -> PeriodOutcome {
        let hash = mix32(period.as_bytes().iter().chain(self.salt.as_bytes()));
        let normalized = f64::from(hash) / 4_294_967_296.0;

        // floor(hash / 2^32 * 10) without leaving integer arithmetic
        let value = u8::try_from((u64::from(hash) * 10) >> 32).unwrap_or(9);

        PeriodOutcome {
            period: period.to_string(),
            value,
            category: Category::of(value),
            tags: Tone::for_value(value),
            confidence: confidence(normalized),
        }
    }

    /// Outcome for a clock-derived period.
    pub fn generate_for(&self, period: &PeriodId) -> PeriodOutcome {
        self.generate(&period.as_key())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn confidence(normalized: f64) -> u8 {
    let distance = (normalized - 0.5).abs();
    (85.0 + distance * 28.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash_vectors() {
        assert_eq!(mix32(b"".iter()), 0xab3e_7c0b);
        assert_eq!(mix32(b"a".iter()), 0x1a80_b1b3);
    }

    #[test]
    fn test_known_period() {
        let outcome = OutcomeGenerator::default().generate("202406011234");
        assert_eq!(outcome.value, 9);
        assert_eq!(outcome.category, Category::Big);
        assert_eq!(outcome.tags, vec![Tone::Green]);
        assert_eq!(outcome.confidence, 97);
        assert_eq!(outcome.period, "202406011234");
    }

    #[test]
    fn test_more_vectors() {
        let generator = OutcomeGenerator::default();

        let next = generator.generate("202406011235");
        assert_eq!((next.value, next.category, next.confidence), (8, Category::Big, 95));
        assert_eq!(next.tags, vec![Tone::Red]);

        let first = generator.generate("202406010001");
        assert_eq!((first.value, first.category, first.confidence), (4, Category::Small, 86));

        let empty = generator.generate("");
        assert_eq!(empty.value, 0);
        assert_eq!(empty.tags, vec![Tone::Red, Tone::Violet]);
        assert_eq!(empty.tag_label(), "Red + Violet");

        let word = generator.generate("hello");
        assert_eq!(word.value, 5);
        assert_eq!(word.tags, vec![Tone::Green, Tone::Violet]);
        assert_eq!(word.confidence, 85);
    }

    #[test]
    fn test_tag_table() {
        for v in [1u8, 3, 7, 9] {
            assert_eq!(Tone::for_value(v), vec![Tone::Green]);
        }
        for v in [2u8, 4, 6, 8] {
            assert_eq!(Tone::for_value(v), vec![Tone::Red]);
        }
        assert_eq!(Tone::for_value(0), vec![Tone::Red, Tone::Violet]);
        assert_eq!(Tone::for_value(5), vec![Tone::Green, Tone::Violet]);
    }

    #[test]
    fn test_category_threshold() {
        for v in 0u8..=9 {
            assert_eq!(Category::of(v) == Category::Big, v >= 5, "value {v}");
        }
    }

    #[test]
    fn test_salt_changes_outcome_stream() {
        let a = OutcomeGenerator::new("salt-a");
        let b = OutcomeGenerator::new("salt-b");
        let differs = (1..=50)
            .map(|seq| format!("2024060100{seq:02}"))
            .any(|p| a.generate(&p) != b.generate(&p));
        assert!(differs);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Category::Small.to_string(), "SMALL");
        assert_eq!(Category::Big.to_string(), "BIG");
        assert_eq!(Tone::Violet.hex(), "#9c27b0");
    }

    proptest! {
        #[test]
        fn prop_generate_is_deterministic(period in ".*") {
            let generator = OutcomeGenerator::default();
            prop_assert_eq!(generator.generate(&period), generator.generate(&period));
        }

        #[test]
        fn prop_ranges_hold(period in ".*") {
            let outcome = OutcomeGenerator::default().generate(&period);
            prop_assert!(outcome.value <= 9);
            prop_assert!((85..=99).contains(&outcome.confidence));
            prop_assert_eq!(outcome.category == Category::Big, outcome.value >= 5);
            prop_assert!(!outcome.tags.is_empty());
        }
    }
}
