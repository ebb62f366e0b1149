use mockito::Matcher;
use serde_json::json;
use zrl_launcher::config::Settings;
use zrl_launcher::core::LauncherError;
use zrl_launcher::decision::{Decision, UpdateClass, UpdateState};
use zrl_launcher::download::{DownloadCoordinator, DownloadJob};
use zrl_launcher::engine::Launcher;
use zrl_launcher::fetch::{AssetFetcher, CancelToken};
use zrl_launcher::test_utils::fixtures;

fn world_zip() -> Vec<u8> {
    fixtures::archive_bytes(&[
        ("Frozen/", b"".as_slice()),
        ("Frozen/level.dat", b"level".as_slice()),
        ("Frozen/region/r.0.0.mca", b"region".as_slice()),
    ])
}

async fn launcher_for(server: &mockito::ServerGuard, game: &std::path::Path) -> Launcher {
    let settings = Settings {
        catalog_url: format!("{}/updates.json", server.url()),
        ..Settings::default()
    };
    Launcher::new(settings).unwrap().with_game_root(Some(game.to_path_buf()))
}

#[tokio::test]
async fn test_fetch_404_leaves_nothing_behind() {
    let mut server = mockito::Server::new_async().await;
    let _m = server.mock("GET", "/missing.zip").with_status(404).create_async().await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("downloads").join("missing.zip");

    let err = AssetFetcher::new()
        .unwrap()
        .fetch(&format!("{}/missing.zip", server.url()), &dest, |_, _| {}, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LauncherError::HttpStatus { status: 404, .. }));
    assert!(!dest.exists());
    assert!(!dir.path().join("downloads").join("missing.zip.part").exists());
}

#[tokio::test]
async fn test_coordinator_collects_every_result() {
    let mut server = mockito::Server::new_async().await;
    let _a = server.mock("GET", "/a.bin").with_body("alpha").create_async().await;
    let _b = server.mock("GET", "/b.bin").with_body("beta").create_async().await;
    let dir = tempfile::tempdir().unwrap();

    let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
    let results = coordinator
        .download_all(vec![
            DownloadJob::new("a", format!("{}/a.bin", server.url()), dir.path().join("a.bin")),
            DownloadJob::new("b", format!("{}/b.bin", server.url()), dir.path().join("b.bin")),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(std::fs::read_to_string(&results["a"]).unwrap(), "alpha");
    assert_eq!(std::fs::read_to_string(&results["b"]).unwrap(), "beta");
}

#[tokio::test]
async fn test_install_map_with_resource_pack() {
    let mut server = mockito::Server::new_async().await;
    let catalog = json!({
        "maps": [{
            "id": "frozen",
            "name": "Frozen Outpost",
            "latest_version": "1.0.0",
            "description": "",
            "download_url": format!("{}/frozen.zip", server.url()),
            "resourcepack_url": format!("{}/frozen-rp.zip", server.url()),
        }]
    });
    let _c = server
        .mock("GET", "/updates.json")
        .match_query(Matcher::Any)
        .with_body(catalog.to_string())
        .create_async()
        .await;
    let _m = server.mock("GET", "/frozen.zip").with_body(world_zip()).create_async().await;
    let _r = server.mock("GET", "/frozen-rp.zip").with_body("pack").create_async().await;

    let game = tempfile::tempdir().unwrap();
    let launcher = launcher_for(&server, game.path()).await;
    let catalog = launcher.fetch_catalog(false).await.unwrap();
    let outcome = launcher.install_map(&catalog, "frozen").await.unwrap();

    assert_eq!(outcome.world_dir.file_name().unwrap(), "Frozen Outpost");
    assert!(outcome.world_dir.join("level.dat").is_file());
    let pack = outcome.resource_pack.unwrap();
    assert_eq!(pack, game.path().join("resourcepacks").join("frozen-rp.zip"));
    assert!(!game.path().join("temp_downloads").exists());
    assert!(!launcher.busy().is_busy());
}

#[tokio::test]
async fn test_failed_resource_pack_installs_nothing() {
    let mut server = mockito::Server::new_async().await;
    let catalog = json!({
        "maps": [{
            "id": "frozen",
            "name": "Frozen",
            "latest_version": "1.0.0",
            "download_url": format!("{}/frozen.zip", server.url()),
            "resourcepack_url": format!("{}/gone.zip", server.url()),
        }]
    });
    let _c = server
        .mock("GET", "/updates.json")
        .match_query(Matcher::Any)
        .with_body(catalog.to_string())
        .create_async()
        .await;
    let _m = server.mock("GET", "/frozen.zip").with_body(world_zip()).create_async().await;
    let _r = server.mock("GET", "/gone.zip").with_status(404).create_async().await;

    let game = tempfile::tempdir().unwrap();
    let launcher = launcher_for(&server, game.path()).await;
    let catalog = launcher.fetch_catalog(false).await.unwrap();
    assert!(launcher.install_map(&catalog, "frozen").await.is_err());

    assert_eq!(std::fs::read_dir(game.path().join("saves")).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(game.path().join("resourcepacks")).unwrap().count(), 0);
}

#[tokio::test]
async fn test_update_mod_replaces_old_jar() {
    let mut server = mockito::Server::new_async().await;
    let catalog = json!({
        "launcher": {"latest_version": "0.0.1", "download_url": ""},
        "mod": {"latest_version": "1.4.0", "download_url": format!("{}/ZombieRool-1.4.0.jar", server.url())},
    });
    let _c = server
        .mock("GET", "/updates.json")
        .match_query(Matcher::Any)
        .with_body(catalog.to_string())
        .create_async()
        .await;
    let _j = server.mock("GET", "/ZombieRool-1.4.0.jar").with_body("new jar").create_async().await;

    let game = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(game.path().join("mods")).unwrap();
    std::fs::write(game.path().join("mods").join("ZombieRool-1.3.2.jar"), "old jar").unwrap();

    let launcher = launcher_for(&server, game.path()).await;
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Idle);
    let (_, report) = launcher.check(true).await.unwrap();
    assert!(matches!(report.launcher, Decision::UpToDate { .. }));
    assert_eq!(launcher.update_state(UpdateClass::Launcher), UpdateState::UpToDate);
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Offer);
    let offer = report.mod_update.offer().unwrap().clone();
    assert_eq!(offer.local.to_string(), "1.3.2");
    assert!(!offer.auto_apply);

    let jar = launcher.update_mod(&offer).await.unwrap();
    assert_eq!(jar, game.path().join("mods").join("ZombieRool-1.4.0.jar"));
    assert!(!game.path().join("mods").join("ZombieRool-1.3.2.jar").exists());
    assert_eq!(launcher.local_mod_version().unwrap(), "1.4.0");
    // Downloading -> Installed is not a legal move, so this also proves Installing was visited.
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Installed);
}

#[tokio::test]
async fn test_mod_update_follows_lifecycle() {
    let mut server = mockito::Server::new_async().await;
    let catalog = json!({
        "mod": {"latest_version": "2.0.0", "download_url": format!("{}/ZombieRool-2.0.0.jar", server.url())},
    });
    let _c = server
        .mock("GET", "/updates.json")
        .match_query(Matcher::Any)
        .with_body(catalog.to_string())
        .create_async()
        .await;
    let jar = server.mock("GET", "/ZombieRool-2.0.0.jar").with_status(404).create_async().await;

    let game = tempfile::tempdir().unwrap();
    let launcher = launcher_for(&server, game.path()).await;

    let offer = {
        let unchecked = launcher_for(&server, game.path()).await;
        let (_, report) = unchecked.check(true).await.unwrap();
        report.mod_update.offer().unwrap().clone()
    };
    let err = launcher.update_mod(&offer).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<LauncherError>(), Some(LauncherError::Transition(t)) if t.from == UpdateState::Idle));
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Idle);

    launcher.check(true).await.unwrap();
    assert!(launcher.update_mod(&offer).await.is_err());
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Failed);
    assert!(!game.path().join("mods").join("ZombieRool-2.0.0.jar").exists());

    // A failed update needs a fresh check before another attempt.
    assert!(launcher.update_mod(&offer).await.is_err());
    jar.assert_async().await;

    jar.remove_async().await;
    let _ok = server.mock("GET", "/ZombieRool-2.0.0.jar").with_body("jar").create_async().await;
    launcher.check(true).await.unwrap();
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Offer);
    launcher.update_mod(&offer).await.unwrap();
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Installed);
}

#[tokio::test]
async fn test_failed_check_marks_both_classes_failed() {
    let mut server = mockito::Server::new_async().await;
    let _c = server
        .mock("GET", "/updates.json")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let game = tempfile::tempdir().unwrap();
    let launcher = launcher_for(&server, game.path()).await;

    assert!(launcher.check(true).await.is_err());
    assert_eq!(launcher.update_state(UpdateClass::Launcher), UpdateState::Failed);
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Failed);
    assert!(!launcher.busy().is_busy());
}

#[tokio::test]
async fn test_content_pack_by_code() {
    let mut server = mockito::Server::new_async().await;
    let catalog = json!({
        "mod": {"latest_version": "1.0.0", "download_url": "https://example.invalid/mod.jar"},
        "content_packs": [{
            "code": "GUNS42",
            "name": "Extra guns",
            "version": "1.0",
            "download_url": format!("{}/guns.zip", server.url()),
        }]
    });
    let _c = server
        .mock("GET", "/updates.json")
        .match_query(Matcher::Any)
        .with_body(catalog.to_string())
        .create_async()
        .await;
    let pack = fixtures::archive_bytes(&[("ExtraGuns-1.0.jar", b"guns".as_slice())]);
    let _p = server.mock("GET", "/guns.zip").with_body(pack).create_async().await;

    let game = tempfile::tempdir().unwrap();
    let launcher = launcher_for(&server, game.path()).await;
    let catalog = launcher.fetch_catalog(true).await.unwrap();

    assert!(launcher.install_content(&catalog, "WRONG").await.is_err());
    let installed = launcher.install_content(&catalog, "GUNS42").await.unwrap();
    assert_eq!(installed.files, vec![game.path().join("mods").join("ExtraGuns-1.0.jar")]);
    assert!(installed.mod_update.offer().is_some());
    assert_eq!(launcher.update_state(UpdateClass::Mod), UpdateState::Offer);
}
