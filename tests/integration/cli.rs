use mockito::Matcher;
use predicates::prelude::*;
use serde_json::json;

use crate::common::CliEnv;

fn serve_catalog(server: &mut mockito::ServerGuard, body: serde_json::Value) -> mockito::Mock {
    server
        .mock("GET", "/updates.json")
        .match_query(Matcher::Any)
        .with_body(body.to_string())
        .create()
}

#[test]
fn test_help_lists_commands() {
    let env = CliEnv::new("http://127.0.0.1:9/updates.json");
    env.zrl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install-map"))
        .stdout(predicate::str::contains("publish"));
}

#[test]
fn test_maps_lists_and_filters() {
    let mut server = mockito::Server::new();
    let _c = serve_catalog(
        &mut server,
        json!({"maps": [
            {"id": "winter", "name": "Winter", "latest_version": "1.0.0", "description": "Snow", "download_url": "u", "author": "alice"},
            {"id": "desert", "name": "Desert", "latest_version": "2.1.0", "description": "Sand", "download_url": "u"}
        ]}),
    );
    let env = CliEnv::new(&format!("{}/updates.json", server.url()));

    env.zrl()
        .arg("maps")
        .assert()
        .success()
        .stdout(predicate::str::contains("winter"))
        .stdout(predicate::str::contains("desert"))
        .stdout(predicate::str::contains("by alice"));

    env.zrl()
        .args(["maps", "--filter", "SNOW"])
        .assert()
        .success()
        .stdout(predicate::str::contains("winter"))
        .stdout(predicate::str::contains("desert").not());
}

#[test]
fn test_check_reports_mod_offer() {
    let mut server = mockito::Server::new();
    let _c = serve_catalog(
        &mut server,
        json!({
            "launcher": {"latest_version": "0.0.1", "download_url": "u"},
            "mod": {"latest_version": "1.3.0", "download_url": "https://example.invalid/ZombieRool-1.3.0.jar"}
        }),
    );
    let env = CliEnv::new(&format!("{}/updates.json", server.url()));

    env.zrl()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"))
        .stdout(predicate::str::contains("0.0.0 -> 1.3.0"))
        .stdout(predicate::str::contains("zrl update-mod"));
}

#[test]
fn test_missing_catalog_is_classified() {
    let mut server = mockito::Server::new();
    let _c = server.mock("GET", "/updates.json").match_query(Matcher::Any).with_status(404).create();
    let env = CliEnv::new(&format!("{}/updates.json", server.url()));

    env.zrl()
        .arg("maps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("The server refused the request"))
        .stderr(predicate::str::contains("404"));
}

#[test]
fn test_publish_requires_token() {
    let env = CliEnv::new("http://127.0.0.1:9/updates.json");
    env.zrl()
        .args(["publish", "--id", "winter", "--name", "Winter", "--version", "1.0.0", "--map", "winter.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn test_config_round_trip() {
    let env = CliEnv::new("http://127.0.0.1:9/updates.json");

    env.zrl().args(["config", "get", "theme"]).assert().success().stdout(predicate::str::contains("System"));
    env.zrl().args(["config", "set", "theme", "Dark"]).assert().success();
    env.zrl().args(["config", "get", "theme"]).assert().success().stdout(predicate::str::contains("Dark"));
    env.zrl().args(["config", "list"]).assert().success().stdout(predicate::str::contains("theme = Dark"));

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(env.preferences_path()).unwrap()).unwrap();
    assert_eq!(stored["theme"], "Dark");
}
