use zrl_launcher::catalog::CatalogDocument;
use zrl_launcher::core::{ErrorKind, LauncherError};
use zrl_launcher::publish::{MapInfo, PublishStep, PublishTransaction};
use zrl_launcher::test_utils::{Fault, MemoryRemote, fixtures, init_test_logging};

use crate::common::{recorder, resource_pack, winter_catalog};

fn winter(version: &str) -> MapInfo {
    MapInfo::new("winter", "Winter", version).with_description("Snowbound bunker")
}

#[tokio::test]
async fn test_first_publish_bootstraps_catalog() {
    init_test_logging(None);
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let pack = resource_pack(dir.path());
    let remote = MemoryRemote::new("alice");
    let (status, lines) = recorder();

    let entry = PublishTransaction::new(&remote)
        .with_status(status)
        .publish(&winter("1.0.0"), &map, Some(&pack))
        .await
        .unwrap();

    assert_eq!(entry.author.as_deref(), Some("alice"));
    assert_eq!(entry.download_url, "memory://releases/map-winter-v1.0.0/Winter.zip");
    assert_eq!(entry.resource_pack(), Some("memory://releases/map-winter-v1.0.0/winter-rp.zip"));

    let catalog = remote.catalog().unwrap();
    assert_eq!(catalog.admins, vec!["alice".to_string()]);
    assert_eq!(catalog.maps, vec![entry]);
    assert_eq!(remote.release_tags(), vec!["map-winter-v1.0.0".to_string()]);
    assert_eq!(remote.asset_names("map-winter-v1.0.0"), vec!["Winter.zip", "winter-rp.zip"]);
    assert_eq!(remote.commit_messages(), vec!["feat: Add map Winter (v1.0.0) via launcher".to_string()]);
    // release + two uploads + commit
    assert_eq!(remote.mutation_count(), 4);

    let lines = lines.lock().unwrap();
    assert_eq!(lines.first().map(String::as_str), Some("Authenticating..."));
    assert_eq!(lines.last().map(String::as_str), Some("Map published."));
}

#[tokio::test]
async fn test_same_version_is_rejected_then_newer_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let remote = MemoryRemote::new("alice");
    remote.seed_catalog(&winter_catalog());

    let err = PublishTransaction::new(&remote).publish(&winter("1.0.0"), &map, None).await.unwrap_err();
    assert_eq!(err.step, PublishStep::CheckVersion);
    assert_eq!(err.kind(), ErrorKind::VersionConflict);
    assert_eq!(remote.mutation_count(), 0);

    let entry = PublishTransaction::new(&remote).publish(&winter("1.1.0"), &map, None).await.unwrap();
    assert_eq!(entry.latest_version, "1.1.0");
    assert_eq!(entry.author.as_deref(), Some("alice"));

    let catalog = remote.catalog().unwrap();
    assert_eq!(catalog.maps.len(), 1);
    assert_eq!(catalog.maps[0].latest_version, "1.1.0");
    assert_eq!(catalog.admins, vec!["admin".to_string()]);
    assert_eq!(remote.commit_messages(), vec!["feat: Update map Winter (v1.1.0) via launcher".to_string()]);
}

#[tokio::test]
async fn test_older_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let remote = MemoryRemote::new("alice");
    remote.seed_catalog(&winter_catalog());

    let err = PublishTransaction::new(&remote).publish(&winter("0.9.9"), &map, None).await.unwrap_err();
    assert!(matches!(
        err.source,
        LauncherError::VersionConflict { ref existing, ref proposed, .. } if existing == "1.0.0" && proposed == "0.9.9"
    ));
}

#[tokio::test]
async fn test_update_by_another_user_keeps_original_author() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::root_map_archive(dir.path());
    let remote = MemoryRemote::new("bob");
    let mut catalog = winter_catalog();
    catalog.maps[0].extra.insert("difficulty".to_string(), serde_json::json!("hard"));
    remote.seed_catalog(&catalog);

    let entry = PublishTransaction::new(&remote).publish(&winter("2.0.0"), &map, None).await.unwrap();
    assert_eq!(entry.author.as_deref(), Some("alice"));
    assert_eq!(remote.catalog().unwrap().maps[0].extra["difficulty"], "hard");
}

#[tokio::test]
async fn test_invalid_archive_makes_no_remote_call() {
    let dir = tempfile::tempdir().unwrap();
    let bad = fixtures::invalid_archive(dir.path());
    let remote = MemoryRemote::new("alice");

    let err = PublishTransaction::new(&remote).publish(&winter("1.0.0"), &bad, None).await.unwrap_err();
    assert_eq!(err.step, PublishStep::Validate);
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(remote.mutation_count(), 0);
    assert!(remote.catalog().is_none());
}

#[tokio::test]
async fn test_rejected_credential_stops_at_authentication() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let remote = MemoryRemote::anonymous();

    let err = PublishTransaction::new(&remote).publish(&winter("1.0.0"), &map, None).await.unwrap_err();
    assert_eq!(err.step, PublishStep::Authenticate);
    assert_eq!(err.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn test_existing_tag_is_a_duplicate_release() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let remote = MemoryRemote::new("alice");
    remote.seed_catalog(&winter_catalog());
    remote.seed_tag("map-winter-v1.1.0");

    let err = PublishTransaction::new(&remote).publish(&winter("1.1.0"), &map, None).await.unwrap_err();
    assert_eq!(err.step, PublishStep::CreateRelease);
    assert_eq!(err.tag.as_deref(), Some("map-winter-v1.1.0"));
    assert_eq!(err.kind(), ErrorKind::DuplicateRelease);
    assert_eq!(remote.mutation_count(), 0);
}

#[tokio::test]
async fn test_upload_failure_orphans_release_and_keeps_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let remote = MemoryRemote::new("alice");
    remote.seed_catalog(&winter_catalog());
    let before = remote.catalog_text();
    remote.fail_on(Fault::UploadAsset("Winter.zip".to_string()));

    let err = PublishTransaction::new(&remote).publish(&winter("1.1.0"), &map, None).await.unwrap_err();
    assert_eq!(err.step, PublishStep::UploadAssets);
    assert!(err.to_string().contains("map-winter-v1.1.0"));
    assert_eq!(remote.release_tags(), vec!["map-winter-v1.1.0".to_string()]);
    assert_eq!(remote.catalog_text(), before);
}

#[tokio::test]
async fn test_concurrent_catalog_change_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let remote = MemoryRemote::new("alice");
    remote.seed_catalog(&winter_catalog());

    let mut raced = winter_catalog();
    raced.admins.push("carol".to_string());
    let raced_text = raced.to_pretty_json().unwrap();
    remote.race_next_commit(&raced_text);

    let err = PublishTransaction::new(&remote).publish(&winter("1.1.0"), &map, None).await.unwrap_err();
    assert_eq!(err.step, PublishStep::UpdateCatalog);
    assert_eq!(err.kind(), ErrorKind::CatalogConflict);
    assert_eq!(remote.catalog_text().as_deref(), Some(raced_text.as_str()));
    assert!(remote.commit_messages().is_empty());
}

#[tokio::test]
async fn test_skeleton_keeps_unknown_top_level_fields() {
    let dir = tempfile::tempdir().unwrap();
    let map = fixtures::nested_map_archive(dir.path(), "Winter");
    let remote = MemoryRemote::new("alice");
    remote.seed_catalog_text(
        r#"{"launcher":{"latest_version":"4.0.0","download_url":"u"},"maps":[],"admins":["alice"],"motd":"Hi"}"#,
    );

    PublishTransaction::new(&remote).publish(&winter("1.0.0"), &map, None).await.unwrap();
    let text = remote.catalog_text().unwrap();
    assert!(text.contains("\"motd\": \"Hi\""));
    let catalog = CatalogDocument::from_json(&text).unwrap();
    assert_eq!(catalog.launcher.unwrap().latest_version, "4.0.0");
}
