//! Optimistic read-modify-write over the remote catalog.
//!
//! Every write carries the fingerprint obtained by the read it is based on.
//! The backend rejects a stale fingerprint with
//! [`LauncherError::CatalogConflict`]; nothing here retries or merges. The
//! document mutations themselves are the pure functions [`upsert_map_entry`]
//! and [`remove_map_entry`].

use tracing::{debug, info};

use super::model::{CatalogDocument, Fingerprint, MapEntry};
use crate::core::Result;
use crate::remote::CatalogBackend;

/// Typed access to the catalog behind a [`CatalogBackend`].
#[derive(Debug)]
pub struct CatalogStore<'a, B: ?Sized> {
    backend: &'a B,
}

impl<'a, B: CatalogBackend + ?Sized> CatalogStore<'a, B> {
    /// Store over `backend`.
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Current document and its fingerprint.
    ///
    /// When the document does not exist, returns `skeleton()` with the absent
    /// fingerprint so the first write creates it.
    pub async fn read<F>(&self, skeleton: F) -> Result<(CatalogDocument, Fingerprint)>
    where
        F: FnOnce() -> CatalogDocument,
    {
        match self.backend.load().await? {
            Some(remote) => {
                debug!("Read catalog {} at {}", self.backend.location(), remote.fingerprint);
                let document = CatalogDocument::from_json(&remote.content)?;
                Ok((document, remote.fingerprint))
            }
            None => {
                info!("Catalog {} does not exist yet, starting from a skeleton", self.backend.location());
                Ok((skeleton(), Fingerprint::absent()))
            }
        }
    }

    /// Commit `document` if the remote is still at `expected`.
    pub async fn write(
        &self,
        document: &CatalogDocument,
        expected: &Fingerprint,
        message: &str,
    ) -> Result<Fingerprint> {
        let content = document.to_pretty_json()?;
        let fingerprint = self.backend.commit(&content, expected, message).await?;
        info!("Catalog {} written ({} -> {})", self.backend.location(), expected, fingerprint);
        Ok(fingerprint)
    }
}

/// Replace the entry sharing `entry.id`, or append it.
#[must_use]
pub fn upsert_map_entry(mut document: CatalogDocument, entry: MapEntry) -> CatalogDocument {
    match document.maps.iter_mut().find(|m| m.id == entry.id) {
        Some(existing) => *existing = entry,
        None => document.maps.push(entry),
    }
    document
}

/// Drop the entry with `id`. Removing an absent id returns the document unchanged.
#[must_use]
pub fn remove_map_entry(mut document: CatalogDocument, id: &str) -> CatalogDocument {
    document.maps.retain(|m| m.id != id);
    document
}
