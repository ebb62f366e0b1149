//! GitHub REST implementation of the remote store.
//!
//! One [`GitHubClient`] is bound to a repository, a branch and (optionally) a
//! personal access token. It implements every trait in [`crate::remote`]:
//!
//! | Trait | Endpoints |
//! |---|---|
//! | [`IdentityProvider`] | `GET /user` |
//! | [`CatalogBackend`] | `GET`/`PUT /repos/{owner}/{repo}/contents/{path}` |
//! | [`ReleaseApi`] | `/releases`, release asset upload, `/git/ref(s)/tags/*`, `/tags` |
//!
//! The catalog fingerprint is the blob SHA reported by the contents API, which
//! GitHub itself checks on `PUT`; a stale SHA is answered with 409 and becomes
//! [`LauncherError::CatalogConflict`].

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::catalog::Fingerprint;
use crate::config::Settings;
use crate::constants::METADATA_TIMEOUT;
use crate::core::{LauncherError, Result};
use crate::remote::{CatalogBackend, IdentityProvider, Release, ReleaseApi, RemoteDocument};

const PAGE_SIZE: usize = 100;

/// Repository coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    /// API root, e.g. `https://api.github.com`
    pub api_base: String,
    /// Owner login
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch holding the catalog
    pub branch: String,
    /// Catalog path inside the repository
    pub catalog_path: String,
}

impl From<&Settings> for RepoLocation {
    fn from(settings: &Settings) -> Self {
        Self {
            api_base: settings.api_base.clone(),
            owner: settings.repo_owner.clone(),
            repo: settings.repo_name.clone(),
            branch: settings.branch.clone(),
            catalog_path: settings.catalog_path.clone(),
        }
    }
}

/// Authenticated GitHub API client for one repository.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    location: RepoLocation,
    token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("location", &self.location)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct UserBody {
    login: String,
}

#[derive(Deserialize)]
struct ContentsBody {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
    sha: String,
}

#[derive(Deserialize)]
struct BlobBody {
    content: String,
}

#[derive(Deserialize)]
struct CommitBody {
    content: CommitContent,
}

#[derive(Deserialize)]
struct CommitContent {
    sha: String,
}

#[derive(Deserialize)]
struct ReleaseBody {
    id: u64,
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    upload_url: Option<String>,
}

impl From<ReleaseBody> for Release {
    fn from(body: ReleaseBody) -> Self {
        Self {
            id: body.id,
            title: body.name.unwrap_or_else(|| body.tag_name.clone()),
            tag: body.tag_name,
            upload_url: body.upload_url,
        }
    }
}

#[derive(Deserialize)]
struct AssetBody {
    browser_download_url: String,
}

#[derive(Deserialize)]
struct TagBody {
    name: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
}

impl GitHubClient {
    /// Client for `location`, acting with `token` when given.
    #[must_use]
    pub fn new(http: reqwest::Client, location: RepoLocation, token: Option<String>) -> Self {
        Self {
            http,
            location,
            token: token.filter(|t| !t.trim().is_empty()),
            timeout: METADATA_TIMEOUT,
        }
    }

    /// Override the per-request timeout for API calls.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a token is configured.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Repository coordinates.
    #[must_use]
    pub const fn repo(&self) -> &RepoLocation {
        &self.location
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.location.api_base.trim_end_matches('/'),
            self.location.owner,
            self.location.repo,
            suffix.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response> {
        debug!("GitHub: {}", operation);
        builder
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LauncherError::from_reqwest(operation, e))
    }

    async fn json<T: serde::de::DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| LauncherError::Remote {
            operation: operation.to_string(),
            status: None,
            message: format!("unexpected response body: {e}"),
        })
    }

    fn require_token(&self, operation: &str) -> Result<()> {
        if self.token.is_none() {
            return Err(LauncherError::Auth {
                reason: format!("a GitHub token is required to {operation}"),
            });
        }
        Ok(())
    }

    async fn paginate<T: serde::de::DeserializeOwned>(&self, operation: &str, suffix: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let url = self.repo_url(&format!("{suffix}?per_page={PAGE_SIZE}&page={page}"));
            let response = self.send(operation, self.request(Method::GET, &url)).await?;
            let response = error_for_status(operation, response).await?;
            let batch: Vec<T> = Self::json(operation, response).await?;
            let last = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if last {
                break;
            }
        }
        Ok(items)
    }
}

/// Turn a non-success response into a typed error.
async fn error_for_status(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = read_error(response).await;
    if status == StatusCode::UNAUTHORIZED {
        return Err(LauncherError::Auth {
            reason: body.message,
        });
    }
    Err(LauncherError::Remote {
        operation: operation.to_string(),
        status: Some(status.as_u16()),
        message: body.message,
    })
}

async fn read_error(response: Response) -> ErrorBody {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody {
        message: if text.is_empty() { status.to_string() } else { text },
        errors: Vec::new(),
    })
}

fn decode_catalog(encoded: &str) -> Result<String> {
    let packed: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(packed).map_err(|e| LauncherError::CatalogParse {
        reason: format!("catalog is not valid base64: {e}"),
    })?;
    String::from_utf8(bytes).map_err(|e| LauncherError::CatalogParse {
        reason: format!("catalog is not valid UTF-8: {e}"),
    })
}

fn content_type_for(name: &str) -> &'static str {
    if name.to_ascii_lowercase().ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    }
}

impl IdentityProvider for GitHubClient {
    async fn authenticate(&self) -> Result<String> {
        self.require_token("authenticate")?;
        let url = format!("{}/user", self.location.api_base.trim_end_matches('/'));
        let response = self.send("authenticate", self.request(Method::GET, &url)).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = read_error(response).await;
            return Err(LauncherError::Auth {
                reason: body.message,
            });
        }
        let response = error_for_status("authenticate", response).await?;
        let user: UserBody = Self::json("authenticate", response).await?;
        debug!("Authenticated as {}", user.login);
        Ok(user.login)
    }
}

impl CatalogBackend for GitHubClient {
    fn location(&self) -> String {
        format!(
            "{}/{}@{}:{}",
            self.location.owner, self.location.repo, self.location.branch, self.location.catalog_path
        )
    }

    async fn load(&self) -> Result<Option<RemoteDocument>> {
        let operation = "read catalog";
        let url = self.repo_url(&format!("contents/{}", self.location.catalog_path));
        let builder = self.request(Method::GET, &url).query(&[("ref", &self.location.branch)]);
        let response = self.send(operation, builder).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = error_for_status(operation, response).await?;
        let body: ContentsBody = Self::json(operation, response).await?;

        // Files over 1 MB come back without inline content.
        let encoded = if body.content.is_empty() || body.encoding.as_deref() == Some("none") {
            debug!("Catalog content not inlined, reading blob {}", body.sha);
            let url = self.repo_url(&format!("git/blobs/{}", body.sha));
            let response = self.send(operation, self.request(Method::GET, &url)).await?;
            let response = error_for_status(operation, response).await?;
            let blob: BlobBody = Self::json(operation, response).await?;
            blob.content
        } else {
            body.content
        };
        let content = decode_catalog(&encoded)?;

        Ok(Some(RemoteDocument {
            content,
            fingerprint: Fingerprint::new(body.sha),
        }))
    }

    async fn commit(&self, content: &str, expected: &Fingerprint, message: &str) -> Result<Fingerprint> {
        let operation = "write catalog";
        self.require_token(operation)?;
        let url = self.repo_url(&format!("contents/{}", self.location.catalog_path));

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.location.branch,
        });
        if !expected.is_absent() {
            body["sha"] = json!(expected.as_str());
        }

        let response = self.send(operation, self.request(Method::PUT, &url).json(&body)).await?;
        let status = response.status();
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            let detail = read_error(response).await;
            debug!("Catalog commit rejected ({}): {}", status, detail.message);
            return Err(LauncherError::CatalogConflict {
                path: self.location(),
                expected: expected.to_string(),
            });
        }
        let response = error_for_status(operation, response).await?;
        let body: CommitBody = Self::json(operation, response).await?;
        Ok(Fingerprint::new(body.content.sha))
    }
}

impl ReleaseApi for GitHubClient {
    async fn create_release(&self, tag: &str, title: &str, body: &str) -> Result<Release> {
        let operation = "create release";
        self.require_token(operation)?;
        let payload = json!({
            "tag_name": tag,
            "name": title,
            "body": body,
            "target_commitish": self.location.branch,
            "draft": false,
            "prerelease": false,
        });
        let url = self.repo_url("releases");
        let response = self.send(operation, self.request(Method::POST, &url).json(&payload)).await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let detail = read_error(response).await;
            if detail.errors.iter().any(|e| e.code == "already_exists") {
                return Err(LauncherError::DuplicateRelease {
                    tag: tag.to_string(),
                });
            }
            return Err(LauncherError::Remote {
                operation: operation.to_string(),
                status: Some(422),
                message: detail.message,
            });
        }
        let response = error_for_status(operation, response).await?;
        let release: ReleaseBody = Self::json(operation, response).await?;
        Ok(release.into())
    }

    async fn upload_asset(&self, release: &Release, path: &Path, name: &str) -> Result<String> {
        let operation = "upload asset";
        self.require_token(operation)?;
        let bytes = tokio::fs::read(path).await.map_err(|e| LauncherError::io(path, e))?;

        let endpoint = match release.upload_url.as_deref() {
            Some(template) => template.split('{').next().unwrap_or(template).to_string(),
            None => format!(
                "https://uploads.github.com/repos/{}/{}/releases/{}/assets",
                self.location.owner, self.location.repo, release.id
            ),
        };

        let builder = self
            .request(Method::POST, &endpoint)
            .query(&[("name", name)])
            .header("Content-Type", content_type_for(name))
            .body(bytes);
        let response = builder
            .send()
            .await
            .map_err(|e| LauncherError::from_reqwest(operation, e))?;
        let response = error_for_status(operation, response).await?;
        let asset: AssetBody = Self::json(operation, response).await?;
        debug!("Uploaded {} -> {}", name, asset.browser_download_url);
        Ok(asset.browser_download_url)
    }

    async fn list_releases(&self) -> Result<Vec<Release>> {
        let bodies: Vec<ReleaseBody> = self.paginate("list releases", "releases").await?;
        Ok(bodies.into_iter().map(Release::from).collect())
    }

    async fn delete_release(&self, release: &Release) -> Result<()> {
        let operation = "delete release";
        self.require_token(operation)?;
        let url = self.repo_url(&format!("releases/{}", release.id));
        let response = self.send(operation, self.request(Method::DELETE, &url)).await?;
        error_for_status(operation, response).await?;
        Ok(())
    }

    async fn get_tag_ref(&self, name: &str) -> Result<Option<String>> {
        let operation = "get tag";
        let url = self.repo_url(&format!("git/ref/tags/{name}"));
        let response = self.send(operation, self.request(Method::GET, &url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        error_for_status(operation, response).await?;
        Ok(Some(name.to_string()))
    }

    async fn delete_tag_ref(&self, name: &str) -> Result<()> {
        let operation = "delete tag";
        self.require_token(operation)?;
        let url = self.repo_url(&format!("git/refs/tags/{name}"));
        let response = self.send(operation, self.request(Method::DELETE, &url)).await?;
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY) {
            debug!("Tag {} already gone", name);
            return Ok(());
        }
        error_for_status(operation, response).await?;
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let tags: Vec<TagBody> = self.paginate("list tags", "tags").await?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }
}
