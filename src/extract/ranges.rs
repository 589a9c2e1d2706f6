/// Energy and BPM range extraction from free-text info blocks
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Upper bound of the energy rating scale
pub const MAX_ENERGY: u32 = 10;

/// An ordered integer range; `min <= max` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: u32,
    pub max: u32,
}

impl IntRange {
    /// Build a range from two bounds in either order
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Interval overlap with `[lo, hi]`
    pub fn overlaps(&self, lo: u32, hi: u32) -> bool {
        self.min <= hi && self.max >= lo
    }
}

/// Which range pattern to scan for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Energy,
    Bpm,
}

impl RangeKind {
    fn regex(self) -> &'static Regex {
        static ENERGY: OnceLock<Regex> = OnceLock::new();
        static BPM: OnceLock<Regex> = OnceLock::new();
        match self {
            // "Energy 4-7 |", "energy: 3 – 5 and"
            RangeKind::Energy => ENERGY.get_or_init(|| {
                Regex::new(r"(?i)\benergy\s*:?\s*(\d{1,3})\s*[-–]\s*(\d{1,3})")
                    .expect("energy pattern is valid")
            }),
            // "| 100-120 BPM", "and 95 – 110 bpm"
            RangeKind::Bpm => BPM.get_or_init(|| {
                Regex::new(r"(?i)(\d{2,3})\s*[-–]\s*(\d{2,3})\s*bpm\b")
                    .expect("bpm pattern is valid")
            }),
        }
    }

    fn accepts(self, range: &IntRange) -> bool {
        match self {
            RangeKind::Energy => range.max <= MAX_ENERGY,
            RangeKind::Bpm => range.min > 0,
        }
    }

    /// Extract the first range of this kind in `text`
    pub fn extract(self, text: &str) -> Option<IntRange> {
        let captures = self.regex().captures(text)?;
        let a = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let b = captures.get(2)?.as_str().parse::<u32>().ok()?;
        let range = IntRange::new(a, b);

        self.accepts(&range).then_some(range)
    }
}

/// `Energy <a>-<b>` anywhere in `text`
pub fn extract_energy(text: &str) -> Option<IntRange> {
    RangeKind::Energy.extract(text)
}

/// `<a>-<b> BPM` anywhere in `text`
pub fn extract_bpm(text: &str) -> Option<IntRange> {
    RangeKind::Bpm.extract(text)
}

/// Scan info blocks in order and return the first valid pair. A block whose
/// pair is rejected does not hide a valid pair in a later block.
pub fn extract_range_from_blocks(kind: RangeKind, blocks: &[Option<String>]) -> Option<IntRange> {
    blocks.iter().flatten().find_map(|block| kind.extract(block))
}
