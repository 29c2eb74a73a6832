//! Format allocation: splitting purchased packs between CD and vinyl.
//!
//! For every product line the customer bought at least one pack of, the
//! submitted per-format quantities must add up to exactly the purchased
//! count. Under- and over-allocation are both rejected. Lines with nothing
//! purchased are skipped entirely, including any quantities sent for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{PackCounts, PackLine, PhysicalFormat};

/// Errors from [`validate_allocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// The submitted quantities for a line do not add up to what was bought.
    #[error("{line}: expected {expected} pack(s) to be allocated, got {got}")]
    Mismatch {
        /// Offending product line.
        line: PackLine,
        /// Packs purchased on that line.
        expected: u32,
        /// Sum of the submitted quantities.
        got: u64,
    },
}

/// Requested quantity per physical format for one product line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSplit {
    /// Packs to ship on CD.
    #[serde(default)]
    pub cd: u32,
    /// Packs to ship on vinyl.
    #[serde(default, alias = "vinyl")]
    pub vinyle: u32,
}

impl FormatSplit {
    /// Quantity for one format.
    #[must_use]
    pub const fn get(&self, format: PhysicalFormat) -> u32 {
        match format {
            PhysicalFormat::Cd => self.cd,
            PhysicalFormat::Vinyle => self.vinyle,
        }
    }

    /// Sum over formats, widened so it cannot overflow.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.cd as u64 + self.vinyle as u64
    }
}

/// A customer's submitted split, keyed by product line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(BTreeMap<PackLine, FormatSplit>);

impl Allocation {
    /// Build an allocation from `(line, split)` pairs.
    pub fn from_splits(splits: impl IntoIterator<Item = (PackLine, FormatSplit)>) -> Self {
        Self(splits.into_iter().collect())
    }

    /// Split submitted for a line; an absent line counts as all zeros.
    #[must_use]
    pub fn split(&self, line: PackLine) -> FormatSplit {
        self.0.get(&line).copied().unwrap_or_default()
    }
}

/// One accepted `(line, format, quantity)` row. Quantities are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatChoice {
    /// Product line.
    #[serde(rename = "packType")]
    pub pack_line: PackLine,
    /// Physical format.
    pub format: PhysicalFormat,
    /// Number of packs on that format.
    pub quantity: u32,
}

/// Check a submitted split against purchased counts.
///
/// On success returns the non-zero rows to persist, in line then format
/// order.
///
/// # Errors
///
/// Returns [`AllocationError::Mismatch`] for the first line (in display
/// order) whose submitted total differs from the purchased count.
pub fn validate_allocation(
    purchased: &PackCounts,
    submitted: &Allocation,
) -> Result<Vec<FormatChoice>, AllocationError> {
    let mut accepted = Vec::new();

    for (line, expected) in purchased.iter() {
        if expected == 0 {
            continue;
        }

        let split = submitted.split(line);
        let got = split.total();
        if got != u64::from(expected) {
            return Err(AllocationError::Mismatch {
                line,
                expected,
                got,
            });
        }

        accepted.extend(
            PhysicalFormat::ALL
                .into_iter()
                .map(|format| FormatChoice {
                    pack_line: line,
                    format,
                    quantity: split.get(format),
                })
                .filter(|choice| choice.quantity > 0),
        );
    }

    Ok(accepted)
}
