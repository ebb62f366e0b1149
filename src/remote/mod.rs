//! Interfaces to the remote store hosting the catalog and map releases.
//!
//! The transactions in [`crate::publish`] only talk to these traits. The
//! production implementation is [`crate::github::GitHubClient`]; tests use
//! `test_utils::MemoryRemote`.
//!
//! Credentials are bound when the implementation is constructed, so none of
//! the methods take a token.

use std::future::Future;
use std::path::Path;

use crate::catalog::Fingerprint;
use crate::core::Result;

/// Raw catalog text plus the fingerprint of that exact revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    /// UTF-8 JSON text
    pub content: String,
    /// Revision token to pass back on commit
    pub fingerprint: Fingerprint,
}

/// A release object on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Remote identifier
    pub id: u64,
    /// Tag the release is attached to
    pub tag: String,
    /// Display title
    pub title: String,
    /// Endpoint accepting asset uploads, when the remote reports one
    pub upload_url: Option<String>,
}

/// Resolves the identity behind the configured credential.
pub trait IdentityProvider: Send + Sync {
    /// Login of the acting user. Fails with [`crate::core::LauncherError::Auth`]
    /// when the credential is missing or rejected.
    fn authenticate(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Compare-and-swap storage for the catalog document.
pub trait CatalogBackend: Send + Sync {
    /// Human-readable location of the document, used in messages.
    fn location(&self) -> String;

    /// Current document, or `None` when it does not exist.
    fn load(&self) -> impl Future<Output = Result<Option<RemoteDocument>>> + Send;

    /// Replace the document if its fingerprint still equals `expected`.
    ///
    /// An absent `expected` fingerprint means "create". A mismatch fails with
    /// [`crate::core::LauncherError::CatalogConflict`] and leaves the remote
    /// untouched. Returns the new fingerprint.
    fn commit(
        &self,
        content: &str,
        expected: &Fingerprint,
        message: &str,
    ) -> impl Future<Output = Result<Fingerprint>> + Send;
}

/// Release, asset and tag operations.
pub trait ReleaseApi: Send + Sync {
    /// Create a release for a new tag. An existing tag fails with
    /// [`crate::core::LauncherError::DuplicateRelease`].
    fn create_release(
        &self,
        tag: &str,
        title: &str,
        body: &str,
    ) -> impl Future<Output = Result<Release>> + Send;

    /// Upload a local file as an asset and return its public download URL.
    fn upload_asset(
        &self,
        release: &Release,
        path: &Path,
        name: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Every release.
    fn list_releases(&self) -> impl Future<Output = Result<Vec<Release>>> + Send;

    /// Delete a release object (its tag survives).
    fn delete_release(&self, release: &Release) -> impl Future<Output = Result<()>> + Send;

    /// Tag reference by name, `None` when it does not exist.
    fn get_tag_ref(&self, name: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Delete a tag reference.
    fn delete_tag_ref(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Names of every tag.
    fn list_tags(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Everything a publish or delete transaction needs.
pub trait RemoteStore: IdentityProvider + CatalogBackend + ReleaseApi {}

impl<T: IdentityProvider + CatalogBackend + ReleaseApi> RemoteStore for T {}
