//! Dotted version handling.
//!
//! Every update decision in the launcher reduces to comparing two dotted version
//! strings (`"1.2.0"` vs `"1.10.0"`). Catalog entries are hand-edited and mod
//! file names are scraped from disk, so parsing is deliberately lenient: it
//! never fails, it degrades to `0.0.0` and logs a warning instead.
//!
//! - [`VersionTriple`]: the parsed, totally ordered form
//! - [`comparison::VersionComparator`]: string-level comparison helpers

pub mod comparison;

pub use comparison::VersionComparator;

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

static LEADING_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[vV]?(\d+(?:\.\d+)*)").unwrap_or_else(|e| unreachable!("invalid version regex: {e}"))
});

/// Ordered tuple of non-negative integers parsed from a dotted string.
///
/// Missing trailing components count as `0`, so `1.2` and `1.2.0` are equal.
/// Components are kept with trailing zeros trimmed so that the derived
/// equality agrees with the ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VersionTriple {
    components: Vec<u64>,
}

impl VersionTriple {
    /// Build from explicit components.
    #[must_use]
    pub fn new(components: impl Into<Vec<u64>>) -> Self {
        let mut components = components.into();
        while components.last() == Some(&0) {
            components.pop();
        }
        Self { components }
    }

    /// `0.0.0`.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse strictly: `None` when no leading numeric component exists.
    ///
    /// Trailing non-numeric text (`"1.3.0-beta"`, `"2.1 final"`) is stripped
    /// before splitting; a leading `v` is accepted.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let captures = LEADING_VERSION.captures(input)?;
        let numeric = captures.get(1)?.as_str();
        let components =
            numeric.split('.').map(str::parse::<u64>).collect::<Result<Vec<_>, _>>().ok()?;
        Some(Self::new(components))
    }

    /// Parse leniently: absent strings are `0.0.0`; unparsable strings are
    /// `0.0.0` with a warning.
    #[must_use]
    pub fn parse_lenient(input: Option<&str>) -> Self {
        let Some(raw) = input else {
            return Self::zero();
        };
        if raw.trim().is_empty() {
            return Self::zero();
        }
        Self::parse(raw).unwrap_or_else(|| {
            warn!("Unparsable version string '{}', treating it as 0.0.0", raw);
            Self::zero()
        })
    }

    /// Component at `index`, `0` when absent.
    #[must_use]
    pub fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }

    /// Whether this is `0.0.0`.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.components.is_empty()
    }
}

impl Ord for VersionTriple {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for VersionTriple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.components.len().max(3);
        let parts: Vec<String> = (0..shown).map(|i| self.component(i).to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}
