//! Update decisions for the launcher, the mod and content packs.
//!
//! [`UpdateDecisionEngine::decide`] compares a local version against a catalog
//! section and yields a [`Decision`]. The launcher is special: any launcher
//! [`Decision::Offer`] carries `auto_apply = true`, because an outdated
//! launcher may misread a newer catalog. Mod and content offers wait for the
//! user.
//!
//! [`UpdateTracker`] enforces the per-class lifecycle:
//!
//! ```text
//! Idle -> Checking
//! Checking -> UpToDate | Offer | Unavailable | Failed
//! Offer -> Downloading -> Installing -> Installed
//!              |              |
//!              +--> Failed <--+
//! ```
//!
//! Every settled state may go back to `Checking`; nothing else may skip it.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{CatalogDocument, ReleaseInfo};
use crate::constants::MOD_FILE_EXTENSION;
use crate::version::VersionTriple;

/// Independent update channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateClass {
    /// This executable
    Launcher,
    /// The game modification jar
    Mod,
    /// A code-unlocked content pack
    Content,
}

impl fmt::Display for UpdateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Launcher => "launcher",
            Self::Mod => "mod",
            Self::Content => "content",
        })
    }
}

/// A newer remote artifact worth offering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOffer {
    /// Channel of the offer
    pub class: UpdateClass,
    /// Installed version
    pub local: VersionTriple,
    /// Remote version
    pub remote: VersionTriple,
    /// Remote version exactly as published
    pub remote_version: String,
    /// Where to download it
    pub download_url: String,
    /// Apply without asking the user
    pub auto_apply: bool,
}

/// Outcome of comparing local and remote versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Local is at least as new as remote.
    UpToDate {
        /// Installed version
        local: VersionTriple,
    },
    /// Remote is strictly newer.
    Offer(RemoteOffer),
    /// The catalog has no usable section for this class.
    Unavailable,
}

impl Decision {
    /// The offer, if any.
    #[must_use]
    pub const fn offer(&self) -> Option<&RemoteOffer> {
        match self {
            Self::Offer(offer) => Some(offer),
            _ => None,
        }
    }

    /// Whether this offer should be applied immediately.
    #[must_use]
    pub const fn should_auto_apply(&self) -> bool {
        matches!(self, Self::Offer(RemoteOffer { auto_apply: true, .. }))
    }
}

/// Launcher and mod decisions from one catalog check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Self-update decision
    pub launcher: Decision,
    /// Mod decision
    pub mod_update: Decision,
}

/// Stateless decision rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateDecisionEngine;

impl UpdateDecisionEngine {
    /// Decide for one class.
    ///
    /// `local` of `None` counts as `0.0.0`. A missing section, or a newer
    /// version without a download URL, is [`Decision::Unavailable`].
    #[must_use]
    pub fn decide(class: UpdateClass, local: Option<&str>, remote: Option<&ReleaseInfo>) -> Decision {
        let local = VersionTriple::parse_lenient(local);
        let Some(remote) = remote else {
            debug!("No {} section in catalog", class);
            return Decision::Unavailable;
        };

        let remote_triple = VersionTriple::parse_lenient(Some(&remote.latest_version));
        if remote_triple <= local {
            return Decision::UpToDate { local };
        }

        if remote.download_url.trim().is_empty() {
            warn!(
                "Catalog announces {} {} but gives no download URL",
                class, remote.latest_version
            );
            return Decision::Unavailable;
        }

        Decision::Offer(RemoteOffer {
            class,
            local,
            remote: remote_triple,
            remote_version: remote.latest_version.clone(),
            download_url: remote.download_url.clone(),
            auto_apply: class == UpdateClass::Launcher,
        })
    }

    /// Decide for the launcher and the mod at once.
    #[must_use]
    pub fn evaluate(catalog: &CatalogDocument, launcher_version: &str, local_mod_version: &str) -> UpdateReport {
        UpdateReport {
            launcher: Self::decide(UpdateClass::Launcher, Some(launcher_version), catalog.launcher.as_ref()),
            mod_update: Self::decide(UpdateClass::Mod, Some(local_mod_version), catalog.mod_info.as_ref()),
        }
    }
}

/// Version of the installed mod, read from its file name.
///
/// Looks for `<prefix>*.jar` in `mods_dir` and keeps only the digits and dots
/// of the part between prefix and extension, so `ZombieRool-1.3.0-beta.jar`
/// yields `1.3.0`. Returns `0.0.0` when the directory or the jar is missing.
#[must_use]
pub fn local_mod_version(mods_dir: Option<&Path>, prefix: &str) -> String {
    const NONE: &str = "0.0.0";
    let Some(dir) = mods_dir else {
        return NONE.to_string();
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return NONE.to_string();
    };

    let mut names: Vec<String> =
        entries.filter_map(|e| e.ok()).filter_map(|e| e.file_name().into_string().ok()).collect();
    names.sort();

    names
        .iter()
        .filter_map(|name| name.strip_prefix(prefix)?.strip_suffix(MOD_FILE_EXTENSION))
        .map(|middle| middle.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect::<String>())
        .find(|version| !version.is_empty())
        .unwrap_or_else(|| NONE.to_string())
}

/// Lifecycle state of one update class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Never checked
    Idle,
    /// Comparing versions
    Checking,
    /// Nothing to do
    UpToDate,
    /// A newer version is available
    Offer,
    /// Remote information missing
    Unavailable,
    /// Artifact transfer running
    Downloading,
    /// Artifact being put in place
    Installing,
    /// Update applied
    Installed,
    /// Update aborted
    Failed,
}

impl UpdateState {
    /// Whether the flow has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::UpToDate | Self::Installed | Self::Failed)
    }

    /// Whether `self -> next` is a legal move.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use UpdateState::{
            Checking, Downloading, Failed, Idle, Installed, Installing, Offer, Unavailable, UpToDate,
        };
        matches!(
            (self, next),
            (Idle, Checking)
                | (Checking, UpToDate | Offer | Unavailable | Failed)
                | (Offer, Downloading)
                | (Downloading, Installing | Failed)
                | (Installing, Installed | Failed)
                | (UpToDate | Offer | Unavailable | Installed | Failed, Checking)
        )
    }
}

impl From<&Decision> for UpdateState {
    fn from(decision: &Decision) -> Self {
        match decision {
            Decision::UpToDate { .. } => Self::UpToDate,
            Decision::Offer(_) => Self::Offer,
            Decision::Unavailable => Self::Unavailable,
        }
    }
}

/// Rejected lifecycle move.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot move {class} update from {from:?} to {to:?}")]
pub struct InvalidTransition {
    /// Class being tracked
    pub class: UpdateClass,
    /// Current state
    pub from: UpdateState,
    /// Requested state
    pub to: UpdateState,
}

/// Tracks the state of one class through a check and an optional install.
#[derive(Debug, Clone)]
pub struct UpdateTracker {
    class: UpdateClass,
    state: UpdateState,
}

impl UpdateTracker {
    /// Tracker starting in [`UpdateState::Idle`].
    #[must_use]
    pub const fn new(class: UpdateClass) -> Self {
        Self {
            class,
            state: UpdateState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> UpdateState {
        self.state
    }

    /// Move to `next`.
    pub fn advance(&mut self, next: UpdateState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                class: self.class,
                from: self.state,
                to: next,
            });
        }
        debug!("{} update: {:?} -> {:?}", self.class, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Settle the check with `decision`.
    pub fn settle(&mut self, decision: &Decision) -> Result<(), InvalidTransition> {
        self.advance(decision.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(version: &str, url: &str) -> ReleaseInfo {
        ReleaseInfo::new(version, url)
    }

    #[test]
    fn test_decide_offer_and_up_to_date() {
        let remote = info("1.3.0", "https://x/m.jar");
        let d = UpdateDecisionEngine::decide(UpdateClass::Mod, Some("1.2.9"), Some(&remote));
        let offer = d.offer().unwrap();
        assert_eq!(offer.remote_version, "1.3.0");
        assert!(!offer.auto_apply);

        let d = UpdateDecisionEngine::decide(UpdateClass::Mod, Some("1.3"), Some(&remote));
        assert_eq!(d, Decision::UpToDate { local: VersionTriple::new([1, 3]) });

        let d = UpdateDecisionEngine::decide(UpdateClass::Mod, Some("2.0.0"), Some(&remote));
        assert!(matches!(d, Decision::UpToDate { .. }));
    }

    #[test]
    fn test_decide_unavailable() {
        assert_eq!(UpdateDecisionEngine::decide(UpdateClass::Mod, Some("1.0.0"), None), Decision::Unavailable);
        let no_url = info("9.9.9", "  ");
        assert_eq!(
            UpdateDecisionEngine::decide(UpdateClass::Mod, Some("1.0.0"), Some(&no_url)),
            Decision::Unavailable
        );
    }

    #[test]
    fn test_launcher_offer_auto_applies() {
        let catalog = CatalogDocument {
            launcher: Some(info("5.0.0", "https://x/zrl")),
            mod_info: Some(info("1.0.0", "https://x/m.jar")),
            ..CatalogDocument::default()
        };
        let report = UpdateDecisionEngine::evaluate(&catalog, "4.2.0", "0.0.0");
        assert!(report.launcher.should_auto_apply());
        assert!(report.mod_update.offer().is_some());
        assert!(!report.mod_update.should_auto_apply());
    }

    #[test]
    fn test_absent_local_is_zero() {
        let remote = info("0.0.1", "u");
        assert!(UpdateDecisionEngine::decide(UpdateClass::Mod, None, Some(&remote)).offer().is_some());
        let garbage = UpdateDecisionEngine::decide(UpdateClass::Mod, Some("latest"), Some(&remote));
        assert!(garbage.offer().is_some());
    }

    #[test]
    fn test_local_mod_version_scans_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("OtherMod-9.9.9.jar"), b"").unwrap();
        std::fs::write(dir.path().join("ZombieRool-1.3.0-beta.jar"), b"").unwrap();

        assert_eq!(local_mod_version(Some(dir.path()), "ZombieRool-"), "1.3.0");
        assert_eq!(local_mod_version(Some(dir.path()), "Missing-"), "0.0.0");
        assert_eq!(local_mod_version(None, "ZombieRool-"), "0.0.0");
        assert_eq!(local_mod_version(Some(&dir.path().join("nope")), "ZombieRool-"), "0.0.0");
    }

    #[test]
    fn test_tracker_happy_path() {
        let mut tracker = UpdateTracker::new(UpdateClass::Mod);
        tracker.advance(UpdateState::Checking).unwrap();
        let decision = Decision::Offer(RemoteOffer {
            class: UpdateClass::Mod,
            local: VersionTriple::zero(),
            remote: VersionTriple::new([1]),
            remote_version: "1".into(),
            download_url: "u".into(),
            auto_apply: false,
        });
        tracker.settle(&decision).unwrap();
        tracker.advance(UpdateState::Downloading).unwrap();
        tracker.advance(UpdateState::Installing).unwrap();
        tracker.advance(UpdateState::Installed).unwrap();
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn test_tracker_rejects_skips() {
        let mut tracker = UpdateTracker::new(UpdateClass::Launcher);
        let err = tracker.advance(UpdateState::Downloading).unwrap_err();
        assert_eq!(err.from, UpdateState::Idle);
        assert!(tracker.advance(UpdateState::UpToDate).is_err());

        tracker.advance(UpdateState::Checking).unwrap();
        tracker.advance(UpdateState::UpToDate).unwrap();
        assert!(tracker.advance(UpdateState::Downloading).is_err());
        tracker.advance(UpdateState::Checking).unwrap();
        tracker.advance(UpdateState::Unavailable).unwrap();
        assert!(!UpdateState::Unavailable.is_terminal());
    }
}
