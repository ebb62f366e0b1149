use std::time::Duration;

use zrl_launcher::core::{ErrorKind, LauncherError};
use zrl_launcher::publish::{DeleteStep, DeleteTransaction};
use zrl_launcher::test_utils::{Fault, MemoryRemote};

use crate::common::winter_catalog;

fn seeded(login: &str) -> MemoryRemote {
    let remote = MemoryRemote::new(login);
    remote.seed_catalog(&winter_catalog());
    remote.seed_release("map-winter-v1.0.0");
    remote.seed_release("map-winter-v1.1.0");
    remote.seed_release("map-winter-night-v1.0.0");
    remote.seed_tag("map-winter-v0.9");
    remote
}

fn delete(remote: &MemoryRemote) -> DeleteTransaction<'_, MemoryRemote> {
    DeleteTransaction::new(remote).with_propagation_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_stranger_cannot_delete() {
    let remote = seeded("bob");
    let before = remote.catalog_text();

    let err = delete(&remote).delete("winter").await.unwrap_err();
    assert_eq!(err.step, DeleteStep::Authorize);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(matches!(
        err.source,
        LauncherError::Authorization { ref actor, ref author, .. } if actor == "bob" && author.as_deref() == Some("alice")
    ));
    assert_eq!(remote.mutation_count(), 0);
    assert_eq!(remote.catalog_text(), before);
    assert_eq!(remote.release_tags().len(), 3);
}

#[tokio::test]
async fn test_author_deletes_releases_tags_and_entry() {
    let remote = seeded("alice");

    let report = delete(&remote).delete("winter").await.unwrap();
    assert_eq!(report.map_id, "winter");
    assert_eq!(report.releases_deleted, 2);
    assert_eq!(report.tags_deleted, 3);
    assert!(report.catalog_updated);

    assert_eq!(remote.release_tags(), vec!["map-winter-night-v1.0.0".to_string()]);
    assert_eq!(remote.tag_names(), vec!["map-winter-night-v1.0.0".to_string()]);
    assert!(remote.catalog().unwrap().find_map("winter").is_none());
    assert_eq!(remote.commit_messages(), vec!["chore: Remove map winter via launcher".to_string()]);
}

#[tokio::test]
async fn test_admin_may_delete_any_map() {
    let remote = seeded("admin");
    let report = delete(&remote).delete("winter").await.unwrap();
    assert!(report.catalog_updated);
}

#[tokio::test]
async fn test_admin_cleans_up_orphaned_releases() {
    let remote = MemoryRemote::new("admin");
    remote.seed_catalog(&winter_catalog());
    remote.seed_release("map-ghost-v1.0.0");
    let before = remote.catalog_text();

    let report = delete(&remote).delete("ghost").await.unwrap();
    assert_eq!(report.releases_deleted, 1);
    assert!(!report.catalog_updated);
    assert_eq!(remote.catalog_text(), before);
    assert!(remote.commit_messages().is_empty());
}

#[tokio::test]
async fn test_non_admin_cannot_clean_up_unknown_map() {
    let remote = MemoryRemote::new("alice");
    remote.seed_catalog(&winter_catalog());
    remote.seed_release("map-ghost-v1.0.0");

    let err = delete(&remote).delete("ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(remote.release_tags(), vec!["map-ghost-v1.0.0".to_string()]);
}

#[tokio::test]
async fn test_missing_catalog_means_no_admins() {
    let remote = MemoryRemote::new("alice");
    let err = delete(&remote).delete("winter").await.unwrap_err();
    assert_eq!(err.step, DeleteStep::Authorize);
}

#[tokio::test]
async fn test_release_deletion_is_best_effort() {
    let remote = seeded("alice");
    remote.fail_on(Fault::DeleteRelease("map-winter-v1.0.0".to_string()));
    remote.fail_on(Fault::DeleteTag("map-winter-v0.9".to_string()));

    let report = delete(&remote).delete("winter").await.unwrap();
    assert_eq!(report.releases_deleted, 1);
    assert_eq!(report.tags_deleted, 2);
    assert!(report.catalog_updated);
    assert!(remote.release_tags().contains(&"map-winter-v1.0.0".to_string()));
    assert!(remote.tag_names().contains(&"map-winter-v0.9".to_string()));
}

#[tokio::test]
async fn test_stale_fingerprint_surfaces_conflict() {
    let remote = seeded("alice");
    let mut raced = winter_catalog();
    raced.maps[0].latest_version = "1.2.0".to_string();
    remote.race_next_commit(&raced.to_pretty_json().unwrap());

    let err = delete(&remote).delete("winter").await.unwrap_err();
    assert_eq!(err.step, DeleteStep::UpdateCatalog);
    assert_eq!(err.kind(), ErrorKind::CatalogConflict);
    assert_eq!(remote.catalog().unwrap().maps[0].latest_version, "1.2.0");
}

#[tokio::test]
async fn test_listing_failure_is_terminal() {
    let remote = seeded("alice");
    remote.fail_on(Fault::ListReleases);

    let err = delete(&remote).delete("winter").await.unwrap_err();
    assert_eq!(err.step, DeleteStep::DeleteReleases);
    assert!(remote.catalog().unwrap().find_map("winter").is_some());
}
