//! Error handling for the launcher.
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** so callers (and tests) can match on exactly what
//!    went wrong, e.g. a stale catalog fingerprint versus a bad credential.
//! 2. **Short classified messages** for users. Every [`LauncherError`] maps onto
//!    an [`ErrorKind`] whose [`headline`](ErrorKind::headline) is what the user
//!    sees first; the raw lower-level text is only ever shown as supplementary
//!    detail through [`ErrorContext`].
//!
//! # Error Categories
//!
//! - **Transfer**: [`LauncherError::Network`], [`LauncherError::HttpStatus`],
//!   [`LauncherError::Io`], [`LauncherError::Cancelled`]
//! - **Publishing**: [`LauncherError::InvalidMapArchive`],
//!   [`LauncherError::VersionConflict`], [`LauncherError::DuplicateRelease`]
//! - **Access**: [`LauncherError::Auth`], [`LauncherError::Authorization`]
//! - **Catalog**: [`LauncherError::CatalogConflict`], [`LauncherError::CatalogParse`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use zrl_launcher::core::{ErrorKind, LauncherError};
//!
//! let err = LauncherError::HttpStatus {
//!     url: "https://example.com/map.zip".to_string(),
//!     status: 404,
//! };
//! assert_eq!(err.kind(), ErrorKind::HttpStatus);
//! ```

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Every failure the launcher engine can report.
///
/// Variants carry enough context (map id, version, release tag, URL) for a human
/// to resolve the problem manually.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// DNS, connection, or timeout failure.
    #[error("Network error during {operation}: {reason}")]
    Network {
        /// What was being attempted
        operation: String,
        /// Lower-level failure text
        reason: String,
    },

    /// The server answered with a 4xx/5xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Local disk failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A cooperative cancellation was observed.
    #[error("Download of {url} was cancelled")]
    Cancelled {
        /// URL of the cancelled transfer
        url: String,
    },

    /// The map archive does not look like a world save.
    #[error("Invalid map archive {path}: {reason}")]
    InvalidMapArchive {
        /// Archive path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Map metadata supplied for publishing is unusable.
    #[error("Invalid {field}: {reason}")]
    InvalidInput {
        /// Offending field (`map id`, `map name`, `version`)
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// A publish did not strictly increase the catalog version of a map.
    #[error(
        "Map '{map_id}' already exists at version {existing}; version {proposed} must be strictly greater"
    )]
    VersionConflict {
        /// Map id
        map_id: String,
        /// Version currently in the catalog
        existing: String,
        /// Version being published
        proposed: String,
    },

    /// A release for the exact tag already exists.
    #[error("A release tagged '{tag}' already exists; increment the map version")]
    DuplicateRelease {
        /// Conflicting release tag
        tag: String,
    },

    /// The credential could not be resolved to an identity.
    #[error("Authentication failed: {reason}")]
    Auth {
        /// Reason reported by the remote
        reason: String,
    },

    /// Valid credential, insufficient rights.
    #[error(
        "'{actor}' may not modify map '{map_id}': only its author ({}) or an admin can",
        .author.as_deref().unwrap_or("N/A")
    )]
    Authorization {
        /// Acting identity
        actor: String,
        /// Map being modified
        map_id: String,
        /// Recorded author, if the entry exists
        author: Option<String>,
    },

    /// The catalog changed between read and write.
    #[error("Catalog '{path}' was modified concurrently (expected fingerprint '{expected}')")]
    CatalogConflict {
        /// Remote document path
        path: String,
        /// Fingerprint the write was based on
        expected: String,
    },

    /// The catalog document is not valid JSON for the schema.
    #[error("Catalog document is malformed: {reason}")]
    CatalogParse {
        /// Parser message
        reason: String,
    },

    /// Any other remote API failure.
    #[error("Remote operation '{operation}' failed: {message}")]
    Remote {
        /// API operation
        operation: String,
        /// HTTP status when known
        status: Option<u16>,
        /// Message reported by the remote
        message: String,
    },

    /// The self-replacement helper could not be prepared or spawned.
    #[error("Self-update failed: {reason}")]
    SelfUpdate {
        /// What went wrong
        reason: String,
    },

    /// A downloaded artifact could not be installed.
    #[error("Failed to install {artifact}: {reason}")]
    Install {
        /// Artifact being installed
        artifact: String,
        /// What went wrong
        reason: String,
    },

    /// A game directory is not configured.
    #[error("The game '{name}' directory is not configured")]
    MissingDirectory {
        /// Which directory (`mods`, `saves`, `resourcepacks`)
        name: String,
    },

    /// Another operation holds the in-flight flag.
    #[error("Cannot start '{operation}' while another operation is running")]
    Busy {
        /// Operation that was refused
        operation: String,
    },

    /// An update step was attempted out of order.
    #[error(transparent)]
    Transition(#[from] crate::decision::InvalidTransition),

    /// Local configuration problem.
    #[error("Configuration error: {message}")]
    Config {
        /// Description
        message: String,
    },
}

/// Classification of a [`LauncherError`] used for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network/DNS/timeout
    Network,
    /// 4xx/5xx answer
    HttpStatus,
    /// Disk write or read failure
    Io,
    /// Malformed map archive
    Validation,
    /// Non-increasing map version
    VersionConflict,
    /// Release tag already exists
    DuplicateRelease,
    /// Bad credential
    Auth,
    /// Insufficient rights
    Authorization,
    /// Stale catalog fingerprint
    CatalogConflict,
    /// Cooperative cancellation
    Cancelled,
    /// Another operation is in flight
    Busy,
    /// Everything else
    Other,
}

impl ErrorKind {
    /// Short message shown to users before any detail.
    #[must_use]
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Network => "Could not reach the update server",
            Self::HttpStatus => "The server refused the request",
            Self::Io => "Could not write to disk",
            Self::Validation => "The map is not valid for publishing",
            Self::VersionConflict => "This map version is already published",
            Self::DuplicateRelease => "A release with this version already exists",
            Self::Auth => "The access token was rejected",
            Self::Authorization => "You are not allowed to change this map",
            Self::CatalogConflict => "The catalog was changed by someone else; retry",
            Self::Cancelled => "The operation was cancelled",
            Self::Busy => "Another operation is already running",
            Self::Other => "The operation failed",
        }
    }
}

impl LauncherError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Io { .. } => ErrorKind::Io,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::InvalidMapArchive { .. } | Self::InvalidInput { .. } => ErrorKind::Validation,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::DuplicateRelease { .. } => ErrorKind::DuplicateRelease,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::CatalogConflict { .. } => ErrorKind::CatalogConflict,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::CatalogParse { .. }
            | Self::Remote { .. }
            | Self::SelfUpdate { .. }
            | Self::Install { .. }
            | Self::MissingDirectory { .. }
            | Self::Transition(_)
            | Self::Config { .. } => ErrorKind::Other,
        }
    }

    /// Build an [`LauncherError::Io`] for `path`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Map a `reqwest` transport error onto the taxonomy.
    ///
    /// Status errors become [`LauncherError::HttpStatus`]; everything else
    /// (DNS, connect, timeout, body decode) is a [`LauncherError::Network`].
    pub fn from_reqwest(operation: impl Into<String>, err: reqwest::Error) -> Self {
        match (err.status(), err.url()) {
            (Some(status), Some(url)) => Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            },
            _ => Self::Network {
                operation: operation.into(),
                reason: err.to_string(),
            },
        }
    }
}

/// Crate-wide result alias.
pub type Result<T, E = LauncherError> = std::result::Result<T, E>;

/// A classified failure decorated with user-facing hints.
#[derive(Debug)]
pub struct ErrorContext {
    /// Classification deciding the headline
    pub kind: ErrorKind,
    /// What the user can do about it
    pub suggestion: Option<String>,
    /// Raw lower-level text, shown after the headline
    pub details: Option<String>,
}

impl ErrorContext {
    /// Context for `kind` without hints.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach supplementary detail.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.kind.headline());

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl From<&LauncherError> for ErrorContext {
    fn from(error: &LauncherError) -> Self {
        let kind = error.kind();
        let ctx = Self::new(kind).with_details(error.to_string());
        match suggestion_for(kind) {
            Some(suggestion) => ctx.with_suggestion(suggestion),
            None => ctx,
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.headline())?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

fn suggestion_for(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::Network => Some("Check your internet connection and try again"),
        ErrorKind::Auth => Some(
            "Make sure the token is valid and has 'Contents' and 'Releases' write access to the repository",
        ),
        ErrorKind::Authorization => Some("Ask the map author or a catalog admin to make this change"),
        ErrorKind::VersionConflict | ErrorKind::DuplicateRelease => {
            Some("Increment the map version and publish again")
        }
        ErrorKind::CatalogConflict => Some("Run the command again to work from a fresh catalog"),
        ErrorKind::Validation => Some(
            "Use a map id without spaces or '/', a non-empty name, a dotted numeric version, and an archive \
             holding level.dat and a region/ folder at its root or inside one top-level folder",
        ),
        ErrorKind::Busy => Some("Wait for the running operation to finish"),
        _ => None,
    }
}

/// Convert any error into a classified, user-friendly [`ErrorContext`].
///
/// The first [`LauncherError`] found in the chain decides the headline; the
/// full chain text becomes the details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    let kind = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<LauncherError>().map(LauncherError::kind))
        .unwrap_or(ErrorKind::Other);

    let ctx = ErrorContext::new(kind).with_details(message);
    match suggestion_for(kind) {
        Some(suggestion) => ctx.with_suggestion(suggestion),
        None => ctx,
    }
}
