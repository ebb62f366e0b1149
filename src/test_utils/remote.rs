//! In-memory remote store.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use crate::catalog::{CatalogDocument, Fingerprint};
use crate::core::{LauncherError, Result};
use crate::remote::{CatalogBackend, IdentityProvider, Release, ReleaseApi, RemoteDocument};

/// An operation [`MemoryRemote`] can be told to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `load`
    Load,
    /// `commit`
    Commit,
    /// `create_release`
    CreateRelease,
    /// `upload_asset` for the named asset
    UploadAsset(String),
    /// `list_releases`
    ListReleases,
    /// `delete_release` for the tag
    DeleteRelease(String),
    /// `delete_tag_ref` for the tag
    DeleteTag(String),
}

#[derive(Debug, Default)]
struct State {
    catalog: Option<String>,
    releases: BTreeMap<u64, Release>,
    assets: BTreeMap<u64, Vec<(String, Vec<u8>)>>,
    tags: BTreeSet<String>,
    next_id: u64,
    faults: HashSet<Fault>,
    commit_messages: Vec<String>,
    race: Option<String>,
}

/// Remote store kept entirely in memory.
///
/// Fingerprints are SHA-256 digests of the catalog text. Every successful
/// state change increments [`mutation_count`](Self::mutation_count); the
/// `seed_*` helpers and reads do not.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    login: Mutex<Option<String>>,
    state: Mutex<State>,
    mutations: AtomicUsize,
}

impl MemoryRemote {
    /// Remote authenticating as `login`.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: Mutex::new(Some(login.into())),
            ..Self::default()
        }
    }

    /// Remote rejecting every credential.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Switch the acting identity; `None` rejects every credential.
    pub fn set_login(&self, login: Option<&str>) {
        *self.login.lock().unwrap_or_else(PoisonError::into_inner) = login.map(ToString::to_string);
    }

    /// Store `document` as the current catalog.
    pub fn seed_catalog(&self, document: &CatalogDocument) {
        self.lock().catalog = Some(document.to_pretty_json().unwrap());
    }

    /// Store raw catalog text.
    pub fn seed_catalog_text(&self, text: &str) {
        self.lock().catalog = Some(text.to_string());
    }

    /// Add a release (and its tag).
    pub fn seed_release(&self, tag: &str) -> Release {
        let mut state = self.lock();
        insert_release(&mut state, tag, &format!("seeded {tag}"))
    }

    /// Add a tag with no release.
    pub fn seed_tag(&self, tag: &str) {
        self.lock().tags.insert(tag.to_string());
    }

    /// Make `fault` fail from now on.
    pub fn fail_on(&self, fault: Fault) {
        self.lock().faults.insert(fault);
    }

    /// Replace the catalog with `text` right before the next commit is
    /// checked, as if another publisher won the race.
    pub fn race_next_commit(&self, text: &str) {
        self.lock().race = Some(text.to_string());
    }

    /// Number of successful state changes.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Parsed current catalog.
    pub fn catalog(&self) -> Option<CatalogDocument> {
        self.lock().catalog.as_deref().map(|text| CatalogDocument::from_json(text).unwrap())
    }

    /// Raw current catalog.
    pub fn catalog_text(&self) -> Option<String> {
        self.lock().catalog.clone()
    }

    /// Release tags, sorted by creation.
    pub fn release_tags(&self) -> Vec<String> {
        self.lock().releases.values().map(|r| r.tag.clone()).collect()
    }

    /// Tag names, sorted.
    pub fn tag_names(&self) -> Vec<String> {
        self.lock().tags.iter().cloned().collect()
    }

    /// Asset names uploaded to the release tagged `tag`.
    pub fn asset_names(&self, tag: &str) -> Vec<String> {
        let state = self.lock();
        state
            .releases
            .values()
            .find(|r| r.tag == tag)
            .and_then(|r| state.assets.get(&r.id))
            .map(|assets| assets.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Messages of every successful commit.
    pub fn commit_messages(&self) -> Vec<String> {
        self.lock().commit_messages.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    fn check(&self, fault: &Fault, operation: &str) -> Result<()> {
        if self.lock().faults.contains(fault) {
            return Err(LauncherError::Remote {
                operation: operation.to_string(),
                status: Some(500),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn fingerprint_of(text: &str) -> Fingerprint {
    Fingerprint::new(hex::encode(Sha256::digest(text.as_bytes())))
}

fn insert_release(state: &mut State, tag: &str, title: &str) -> Release {
    state.next_id += 1;
    let release = Release {
        id: state.next_id,
        tag: tag.to_string(),
        title: title.to_string(),
        upload_url: None,
    };
    state.releases.insert(release.id, release.clone());
    state.tags.insert(tag.to_string());
    release
}

impl IdentityProvider for MemoryRemote {
    async fn authenticate(&self) -> Result<String> {
        let login = self.login.lock().unwrap_or_else(PoisonError::into_inner).clone();
        login.ok_or_else(|| LauncherError::Auth {
            reason: "no valid credential".to_string(),
        })
    }
}

impl CatalogBackend for MemoryRemote {
    fn location(&self) -> String {
        "memory:updates.json".to_string()
    }

    async fn load(&self) -> Result<Option<RemoteDocument>> {
        self.check(&Fault::Load, "load catalog")?;
        Ok(self.lock().catalog.as_ref().map(|content| RemoteDocument {
            fingerprint: fingerprint_of(content),
            content: content.clone(),
        }))
    }

    async fn commit(&self, content: &str, expected: &Fingerprint, message: &str) -> Result<Fingerprint> {
        self.check(&Fault::Commit, "commit catalog")?;
        let mut state = self.lock();
        if let Some(raced) = state.race.take() {
            state.catalog = Some(raced);
        }
        let current = state.catalog.as_deref().map_or_else(Fingerprint::absent, fingerprint_of);
        if current != *expected {
            return Err(LauncherError::CatalogConflict {
                path: self.location(),
                expected: expected.to_string(),
            });
        }
        state.catalog = Some(content.to_string());
        state.commit_messages.push(message.to_string());
        drop(state);
        self.mutated();
        Ok(fingerprint_of(content))
    }
}

impl ReleaseApi for MemoryRemote {
    async fn create_release(&self, tag: &str, title: &str, _body: &str) -> Result<Release> {
        self.check(&Fault::CreateRelease, "create release")?;
        let mut state = self.lock();
        if state.tags.contains(tag) {
            return Err(LauncherError::DuplicateRelease { tag: tag.to_string() });
        }
        let release = insert_release(&mut state, tag, title);
        drop(state);
        self.mutated();
        Ok(release)
    }

    async fn upload_asset(&self, release: &Release, path: &Path, name: &str) -> Result<String> {
        self.check(&Fault::UploadAsset(name.to_string()), "upload asset")?;
        let bytes = std::fs::read(path).map_err(|e| LauncherError::io(path, e))?;
        let mut state = self.lock();
        if !state.releases.contains_key(&release.id) {
            return Err(LauncherError::Remote {
                operation: "upload asset".to_string(),
                status: Some(404),
                message: format!("release {} not found", release.id),
            });
        }
        state.assets.entry(release.id).or_default().push((name.to_string(), bytes));
        drop(state);
        self.mutated();
        Ok(format!("memory://releases/{}/{}", release.tag, name))
    }

    async fn list_releases(&self) -> Result<Vec<Release>> {
        self.check(&Fault::ListReleases, "list releases")?;
        Ok(self.lock().releases.values().cloned().collect())
    }

    async fn delete_release(&self, release: &Release) -> Result<()> {
        self.check(&Fault::DeleteRelease(release.tag.clone()), "delete release")?;
        let mut state = self.lock();
        state.assets.remove(&release.id);
        let removed = state.releases.remove(&release.id).is_some();
        drop(state);
        if removed {
            self.mutated();
        }
        Ok(())
    }

    async fn get_tag_ref(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lock().tags.contains(name).then(|| format!("refs/tags/{name}")))
    }

    async fn delete_tag_ref(&self, name: &str) -> Result<()> {
        self.check(&Fault::DeleteTag(name.to_string()), "delete tag")?;
        let removed = self.lock().tags.remove(name);
        if removed {
            self.mutated();
        }
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.lock().tags.iter().cloned().collect())
    }
}
