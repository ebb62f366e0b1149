//! String-level version comparison.
//!
//! # Examples
//!
//! ```rust
//! use std::cmp::Ordering;
//! use zrl_launcher::version::VersionComparator;
//!
//! assert_eq!(VersionComparator::compare("1.2.0", "1.10.0"), Ordering::Less);
//! assert!(VersionComparator::is_newer("4.3.0", "4.2.0"));
//! ```

use std::cmp::Ordering;

use super::VersionTriple;

/// Compares dotted version strings numerically, component by component.
///
/// Never fails: unparsable inputs are treated as `0.0.0` (see
/// [`VersionTriple::parse_lenient`]).
pub struct VersionComparator;

impl VersionComparator {
    /// Order `a` relative to `b`.
    #[must_use]
    pub fn compare(a: &str, b: &str) -> Ordering {
        Self::compare_opt(Some(a), Some(b))
    }

    /// Order two possibly-absent versions; absent means `0.0.0`.
    #[must_use]
    pub fn compare_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
        VersionTriple::parse_lenient(a).cmp(&VersionTriple::parse_lenient(b))
    }

    /// Whether `candidate` is strictly greater than `current`.
    #[must_use]
    pub fn is_newer(candidate: &str, current: &str) -> bool {
        Self::compare(candidate, current) == Ordering::Greater
    }
}
