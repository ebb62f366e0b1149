//! Catalog document schema.
//!
//! The catalog is the JSON file every launcher reads on startup. Fields this
//! crate does not know about are kept in `extra` maps so a read-modify-write
//! by an older launcher never drops data written by a newer one.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{LauncherError, Result};

/// `{latest_version, download_url}` section for the launcher or the mod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Dotted version of the newest build
    #[serde(default)]
    pub latest_version: String,
    /// Direct download URL; empty when nothing is published yet
    #[serde(default)]
    pub download_url: String,
    /// Unknown fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReleaseInfo {
    /// Section announcing `version` at `download_url`.
    pub fn new(version: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            latest_version: version.into(),
            download_url: download_url.into(),
            extra: Map::new(),
        }
    }
}

/// A published map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Unique key
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Dotted version
    #[serde(default)]
    pub latest_version: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Map archive URL
    #[serde(default)]
    pub download_url: String,
    /// Optional resource pack URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resourcepack_url: Option<String>,
    /// Login of the first publisher; never changes afterwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Unknown fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapEntry {
    /// Whether `query` appears (case-insensitively) in the id, name or description.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [&self.id, &self.name, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }

    /// Resource pack URL if one is attached.
    #[must_use]
    pub fn resource_pack(&self) -> Option<&str> {
        self.resourcepack_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Downloadable content unlocked by a code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPack {
    /// Unlock code
    pub code: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Dotted version
    #[serde(default)]
    pub version: String,
    /// Archive URL
    #[serde(default)]
    pub download_url: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unknown fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Launcher section; `None` when the catalog does not announce one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<ReleaseInfo>,
    /// Mod section
    #[serde(rename = "mod", default, skip_serializing_if = "Option::is_none")]
    pub mod_info: Option<ReleaseInfo>,
    /// Published maps
    #[serde(default)]
    pub maps: Vec<MapEntry>,
    /// Code-unlocked content
    #[serde(default)]
    pub content_packs: Vec<ContentPack>,
    /// Logins allowed to modify any map
    #[serde(default)]
    pub admins: Vec<String>,
    /// Unknown top-level fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogDocument {
    /// Starting document used when the remote catalog does not exist yet.
    ///
    /// `admin` becomes the only administrator.
    pub fn skeleton(admin: impl Into<String>) -> Self {
        Self {
            launcher: Some(ReleaseInfo::new("0.0.0", "")),
            mod_info: Some(ReleaseInfo::new("0.0.0", "")),
            maps: Vec::new(),
            content_packs: Vec::new(),
            admins: vec![admin.into()],
            extra: Map::new(),
        }
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| LauncherError::CatalogParse {
            reason: e.to_string(),
        })
    }

    /// Serialize with a four-space indent, non-ASCII kept as UTF-8.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer).map_err(|e| LauncherError::CatalogParse {
            reason: e.to_string(),
        })?;
        String::from_utf8(buf).map_err(|e| LauncherError::CatalogParse {
            reason: e.to_string(),
        })
    }

    /// Map with the given id.
    #[must_use]
    pub fn find_map(&self, id: &str) -> Option<&MapEntry> {
        self.maps.iter().find(|m| m.id == id)
    }

    /// Content pack unlocked by `code`.
    #[must_use]
    pub fn find_content_pack(&self, code: &str) -> Option<&ContentPack> {
        self.content_packs.iter().find(|p| p.code == code)
    }

    /// Whether `login` is listed in `admins`.
    #[must_use]
    pub fn is_admin(&self, login: &str) -> bool {
        self.admins.iter().any(|a| a == login)
    }

    /// Maps matching `filter`, or all maps when it is `None` or blank.
    #[must_use]
    pub fn list_maps(&self, filter: Option<&str>) -> Vec<&MapEntry> {
        match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(query) => self.maps.iter().filter(|m| m.matches(query)).collect(),
            None => self.maps.iter().collect(),
        }
    }
}

/// Opaque token identifying one exact revision of the remote catalog.
///
/// The empty fingerprint stands for "document does not exist".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a backend-provided token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Fingerprint of an absent document.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Whether this stands for an absent document.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<absent>")
        } else {
            f.write_str(&self.0)
        }
    }
}
