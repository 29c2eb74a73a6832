//! Product lines, physical formats and per-line purchase counts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A product line of the box set. Each purchased unit is one "pack".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackLine {
    /// The "Mélancolie" pack.
    Melancolie,
    /// The "Symphonie des siècles" pack.
    Symphonie,
}

impl PackLine {
    /// Every product line, in display order.
    pub const ALL: [Self; 2] = [Self::Melancolie, Self::Symphonie];

    /// Storage and wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Melancolie => "melancolie",
            Self::Symphonie => "symphonie",
        }
    }

    /// Human-readable name used in emails.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Melancolie => "Mélancolie",
            Self::Symphonie => "Symphonie des siècles",
        }
    }
}

impl fmt::Display for PackLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PackLine {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "melancolie" => Ok(Self::Melancolie),
            "symphonie" => Ok(Self::Symphonie),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// A physical medium a pack can be shipped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhysicalFormat {
    /// Compact disc.
    #[serde(rename = "cd")]
    Cd,
    /// Vinyl record.
    #[serde(rename = "vinyle", alias = "vinyl")]
    Vinyle,
}

impl PhysicalFormat {
    /// Every format, in display order.
    pub const ALL: [Self; 2] = [Self::Cd, Self::Vinyle];

    /// Storage and wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cd => "cd",
            Self::Vinyle => "vinyle",
        }
    }

    /// Human-readable name used in emails.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cd => "CD",
            Self::Vinyle => "Vinyle",
        }
    }
}

impl fmt::Display for PhysicalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhysicalFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cd" => Ok(Self::Cd),
            "vinyle" | "vinyl" => Ok(Self::Vinyle),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// A stored identifier that matches no known pack line or format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

/// Number of packs a customer bought, per product line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackCounts {
    /// Mélancolie packs purchased.
    pub melancolie: u32,
    /// Symphonie packs purchased.
    pub symphonie: u32,
}

impl PackCounts {
    /// Create counts for both lines.
    #[must_use]
    pub const fn new(melancolie: u32, symphonie: u32) -> Self {
        Self {
            melancolie,
            symphonie,
        }
    }

    /// Purchased count for one line.
    #[must_use]
    pub const fn get(&self, line: PackLine) -> u32 {
        match line {
            PackLine::Melancolie => self.melancolie,
            PackLine::Symphonie => self.symphonie,
        }
    }

    /// Total packs across all lines.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.melancolie as u64 + self.symphonie as u64
    }

    /// Whether at least one pack was purchased.
    #[must_use]
    pub const fn has_any(&self) -> bool {
        self.total() > 0
    }

    /// Iterate `(line, count)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (PackLine, u32)> + '_ {
        PackLine::ALL.into_iter().map(|line| (line, self.get(line)))
    }
}
