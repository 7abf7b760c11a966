//! Integration tests for the nixpub CLI
//!
//! These run the compiled binary against a temporary project.
//! Unit tests for individual functions live in their respective source files.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000";

fn nixpub_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nixpub"))
}

const CONFIG: &str = r#"project_name: foo
release:
  github:
    owner: goreleaser
    name: foo
nix:
  - ids: [foo]
    description: "my test"
    license: mit
    repository:
      owner: foo
      name: bar
"#;

const ARTIFACTS: &str = r#"[
  {
    "name": "foo_linux_amd64v1.tar.gz",
    "path": "dist/foo_linux_amd64v1.tar.gz",
    "goos": "linux",
    "goarch": "amd64",
    "goamd64": "v1",
    "type": "Archive",
    "extra": { "ID": "foo", "Format": "tar.gz", "Binaries": ["foo"] }
  },
  {
    "name": "foo_darwin_arm64.tar.gz",
    "path": "dist/foo_darwin_arm64.tar.gz",
    "goos": "darwin",
    "goarch": "arm64",
    "type": "Archive",
    "extra": { "ID": "foo", "Format": "tar.gz", "Binaries": ["foo"] }
  }
]"#;

fn project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".nixpub.yaml"), config).unwrap();
    fs::create_dir_all(temp.path().join("dist")).unwrap();
    fs::write(temp.path().join("dist/artifacts.json"), ARTIFACTS).unwrap();
    temp
}

fn run(dir: &Path, args: &[&str]) -> std::process::Output {
    nixpub_command()
        .args(args)
        .current_dir(dir)
        .env_remove("GITHUB_TOKEN")
        .output()
        .unwrap()
}

#[test]
fn test_build_writes_manifest_and_artifact() {
    let temp = project(CONFIG);
    let output = run(temp.path(), &["build", "--tag", "v1.2.1"]);
    assert!(
        output.status.success(),
        "nixpub build should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let manifest = temp.path().join("dist/nix/pkgs/foo/default.nix");
    let content = fs::read_to_string(&manifest).unwrap();
    assert!(content.contains(ZERO_HASH));
    assert!(content.contains(
        "https://github.com/goreleaser/foo/releases/download/v1.2.1/foo_linux_amd64v1.tar.gz"
    ));
    assert!(content.contains("  version = \"1.2.1\";"));

    let artifacts = fs::read_to_string(temp.path().join("dist/artifacts.json")).unwrap();
    assert!(artifacts.contains("\"Nixpkg\""));
}

#[test]
fn test_build_from_subdirectory() {
    let temp = project(CONFIG);
    let sub = temp.path().join("src");
    fs::create_dir_all(&sub).unwrap();

    let output = run(&sub, &["build", "--tag", "v1.2.1"]);
    assert!(output.status.success());
    assert!(temp.path().join("dist/nix/pkgs/foo/default.nix").is_file());
}

#[test]
fn test_build_reports_no_archives() {
    let temp = project(&CONFIG.replace("ids: [foo]", "ids: [nope]"));
    let output = run(temp.path(), &["build", "--tag", "v1.2.1"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no archives found matching"), "{}", stderr);
    assert!(stderr.contains("ids=[nope]"));
    assert!(stderr.contains("💡 Suggestion"));
}

#[test]
fn test_publish_skips_without_checksum_tool() {
    let temp = project(CONFIG);
    let empty_path = TempDir::new().unwrap();
    let output = nixpub_command()
        .args(["publish", "--tag", "v1.2.1"])
        .current_dir(temp.path())
        .env("PATH", empty_path.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nix-prefetch-url not found"), "{}", stdout);
}

#[test]
fn test_missing_config() {
    let temp = TempDir::new().unwrap();
    let output = run(temp.path(), &["build", "--tag", "v1.2.1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(".nixpub.yaml"), "{}", stderr);
}

#[test]
fn test_explicit_config_path() {
    let temp = project(CONFIG);
    let other = TempDir::new().unwrap();
    let config = temp.path().join(".nixpub.yaml");

    let output = run(
        other.path(),
        &["build", "--tag", "v1.2.1", "--config", config.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(temp.path().join("dist/nix/pkgs/foo/default.nix").is_file());
}

#[cfg(unix)]
#[test]
fn test_release_publishes_healthy_packages_after_a_build_failure() {
    use std::os::unix::fs::PermissionsExt;

    let config = CONFIG.replace(
        "nix:\n",
        "nix:\n  - name: broken\n    ids: [nope]\n    repository:\n      owner: foo\n      name: bar\n",
    );
    let temp = project(&config);

    // checksum tool that records every URL it is asked for
    let bin = TempDir::new().unwrap();
    let log = temp.path().join("prefetched.log");
    let tool = bin.path().join("nix-prefetch-url");
    fs::write(
        &tool,
        format!("#!/bin/sh\necho \"$1\" >> {}\necho sha-ok\n", log.display()),
    )
    .unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

    let output = nixpub_command()
        .args(["release", "--tag", "v1.2.1"])
        .current_dir(temp.path())
        .env("PATH", bin.path())
        .env_remove("GITHUB_TOKEN")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no archives found matching"), "{}", stderr);
    assert!(temp.path().join("dist/nix/pkgs/foo/default.nix").is_file());

    let prefetched = fs::read_to_string(&log).unwrap();
    assert!(
        prefetched.contains("/releases/download/v1.2.1/foo_linux_amd64v1.tar.gz"),
        "{}",
        prefetched
    );
}
