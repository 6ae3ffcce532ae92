use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

const CONFIG: &str = r#"{
  "families": [
    { "name": "Brand", "src": "https://fonts.example/brand.woff2" },
    { "name": "Site", "src": "/fonts/site.woff2", "global": true },
    { "name": "Legacy", "provider": "none" }
  ]
}"#;

fn write_config(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("fonts.json");
    fs::write(&path, CONFIG).expect("write config");
    path.to_string_lossy().into_owned()
}

#[test]
fn rewrite_injects_manual_faces() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = write_config(&tmp);
    let css = tmp.path().join("style.css");
    fs::write(&css, "h1 { font-family: Brand, serif; }\n").expect("write css");

    let exe = assert_cmd::cargo_bin!("fontlift");
    let output = Command::new(exe)
        .args(["rewrite", "--config", &config, css.to_string_lossy().as_ref()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(output).expect("utf8");
    assert!(out.starts_with("@font-face {\n  font-family: 'Brand';\n"));
    assert!(out.contains("url(\"/_fonts/brand-"));
    assert!(out.ends_with("h1 { font-family: Brand, serif; }\n"));
}

#[test]
fn rewrite_reads_stdin_and_minifies_in_build_mode() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = write_config(&tmp);

    let exe = assert_cmd::cargo_bin!("fontlift");
    let output = assert_cmd::Command::new(exe)
        .args(["--config", &config, "--build", "-"])
        .write_stdin("h1{font-family:Brand}")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(output).expect("utf8");
    assert!(out.starts_with("@font-face{font-family:'Brand';src:url(\"/_fonts/brand-"));
    assert!(out.ends_with("h1{font-family:Brand}"));
}

#[test]
fn rewrite_passes_unmanaged_stylesheets_through() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = write_config(&tmp);
    let input = "p { font-family: Legacy, sans-serif; }\n";

    let exe = assert_cmd::cargo_bin!("fontlift");
    let output = assert_cmd::Command::new(exe)
        .args(["--config", &config])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8(output).expect("utf8"), input);
}

#[test]
fn rewrite_processes_variables_on_request() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = write_config(&tmp);
    let input = ":root { --heading: \"Brand\", serif; }";

    let exe = assert_cmd::cargo_bin!("fontlift");
    let output = assert_cmd::Command::new(exe)
        .args(["--config", &config, "--variables", "--id", "vars.css"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8(output).expect("utf8").contains("font-family: 'Brand';"));
}

#[test]
fn global_prints_global_families() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = write_config(&tmp);

    let exe = assert_cmd::cargo_bin!("fontlift");
    let output = Command::new(exe)
        .args(["global", "--config", &config])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        String::from_utf8(output).expect("utf8"),
        "@font-face {\n  font-family: 'Site';\n  src: url(\"/fonts/site.woff2\") format(\"woff2\");\n  font-display: swap;\n}\n"
    );
}

#[test]
fn global_without_global_families_exits_3() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("empty.json");
    fs::write(&path, "{}").expect("write config");

    let exe = assert_cmd::cargo_bin!("fontlift");
    Command::new(exe)
        .args(["global", "--config", path.to_string_lossy().as_ref()])
        .assert()
        .code(3);
}

#[test]
fn usage_errors_exit_2() {
    let exe = assert_cmd::cargo_bin!("fontlift");
    Command::new(&exe).args(["--bogus"]).assert().code(2);
    Command::new(&exe).args(["global"]).assert().code(2);
    Command::new(&exe).args(["--config"]).assert().code(2);
}

#[test]
fn invalid_config_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("bad.json");
    fs::write(&path, "{ \"families\": 1 }").expect("write config");
    let css = tmp.path().join("style.css");
    fs::write(&css, "a { font-family: X; }").expect("write css");

    let exe = assert_cmd::cargo_bin!("fontlift");
    Command::new(exe)
        .args([
            "--config",
            path.to_string_lossy().as_ref(),
            css.to_string_lossy().as_ref(),
        ])
        .assert()
        .code(1);
}
