use std::time::Duration;

use zrl_launcher::core::LauncherError;
use zrl_launcher::selfupdate::SelfReplacer;

#[test]
fn test_prepare_without_spawn_leaves_original_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let current = dir.path().join("zrl");
    std::fs::write(&current, b"old launcher").unwrap();
    let update_dir = dir.path().join("temp_launcher_update");
    std::fs::create_dir_all(&update_dir).unwrap();
    let downloaded = update_dir.join("zrl-new");
    std::fs::write(&downloaded, b"new launcher").unwrap();

    let plan = SelfReplacer::new()
        .with_delay(Duration::from_secs(1))
        .with_current_executable(&current)
        .prepare(&downloaded)
        .unwrap();
    assert!(plan.helper_script.is_file());
    assert_eq!(plan.temp_dir, std::fs::canonicalize(&update_dir).unwrap());

    // The process "crashes" here: the plan is dropped before execute().
    drop(plan);
    assert_eq!(std::fs::read(&current).unwrap(), b"old launcher");
    assert_eq!(std::fs::read(&downloaded).unwrap(), b"new launcher");
}

#[test]
fn test_prepare_refuses_directory_holding_current_executable() {
    let dir = tempfile::tempdir().unwrap();
    let current = dir.path().join("zrl");
    std::fs::write(&current, b"old").unwrap();
    let downloaded = dir.path().join("zrl-new");
    std::fs::write(&downloaded, b"new").unwrap();

    let err = SelfReplacer::new().with_current_executable(&current).prepare(&downloaded).unwrap_err();
    assert!(matches!(err, LauncherError::SelfUpdate { .. }));
    assert!(!dir.path().join("update_helper.sh").exists());
    assert!(!dir.path().join("update_helper.bat").exists());
}

#[test]
fn test_prepare_requires_download() {
    let dir = tempfile::tempdir().unwrap();
    let err = SelfReplacer::new()
        .with_current_executable(dir.path().join("zrl"))
        .prepare(&dir.path().join("update").join("missing"))
        .unwrap_err();
    assert!(matches!(err, LauncherError::SelfUpdate { .. }));
}
