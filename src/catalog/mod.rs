//! The remote catalog: schema, public read path and transactional store.

pub mod model;
pub mod public;
pub mod store;

pub use model::{CatalogDocument, ContentPack, Fingerprint, MapEntry, ReleaseInfo};
pub use public::PublicCatalog;
pub use store::{CatalogStore, remove_map_entry, upsert_map_entry};
