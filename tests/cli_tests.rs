
use predicates::prelude::*;
use ranet_vault::archive::create_full_backup;
use ranet_vault::config::VaultContext;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use test_helpers::{base_vault_command, entry_count, raw_archive, seed_live};

fn seeded_host(dir: &TempDir) -> VaultContext {
    let ctx = VaultContext::rooted_at(dir.path());
    seed_live(&ctx, b"speedtest-rows=42", &[("interfaces/eth0.db", b"eth0")]);
    ctx
}

fn only_file(dir: &Path) -> PathBuf {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1, "expected one file in {:?}", dir);
    entries.remove(0)
}

#[test]
fn test_cli_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    base_vault_command(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("restore"));
}

#[test]
fn test_cli_invalid_log_format() {
    let dir = TempDir::new().unwrap();
    base_vault_command(dir.path())
        .args(["--log-format", "xml", "backup"])
        .assert()
        .failure();
}

#[test]
fn test_cli_backup_writes_archive() {
    let dir = TempDir::new().unwrap();
    let ctx = seeded_host(&dir);

    base_vault_command(dir.path())
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup written to"))
        .stdout(predicate::str::contains("OK"));

    let archive = only_file(&ctx.backup_dir);
    let name = archive.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("ranet-backup-"), "{}", name);
}

#[test]
fn test_cli_backup_to_out_dir() {
    let dir = TempDir::new().unwrap();
    let ctx = seeded_host(&dir);
    let outbox = dir.path().join("outbox");

    base_vault_command(dir.path())
        .arg("backup")
        .arg("--out-dir")
        .arg(&outbox)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup delivered to"));

    only_file(&outbox);
    assert_eq!(entry_count(&ctx.backup_dir), 0);
}

#[test]
fn test_cli_inspect_valid_archive() {
    let dir = TempDir::new().unwrap();
    let ctx = seeded_host(&dir);
    let archive = create_full_backup(&ctx).unwrap().archive_path;

    base_vault_command(dir.path())
        .arg("inspect")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("opt/ranet-bot/speedtest.db"))
        .stdout(predicate::str::contains("[FOUND]"));
}

#[test]
fn test_cli_inspect_foreign_archive_fails() {
    let dir = TempDir::new().unwrap();
    let archive = raw_archive(
        &dir.path().join("in/other.tgz"),
        &[("etc/hosts", b"127.0.0.1 localhost")],
    );

    base_vault_command(dir.path())
        .arg("inspect")
        .arg(&archive)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[MISS]"));
}

#[test]
fn test_cli_restore_without_yes_only_previews() {
    let dir = TempDir::new().unwrap();
    let ctx = seeded_host(&dir);
    let archive = create_full_backup(&ctx).unwrap().archive_path;
    fs::write(&ctx.live.settings_db, b"changed").unwrap();

    base_vault_command(dir.path())
        .arg("restore")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Re-run with --yes"));

    assert_eq!(fs::read(&ctx.live.settings_db).unwrap(), b"changed");
    assert_eq!(entry_count(&ctx.backup_dir), 1, "staged copy should be gone");
}

#[test]
fn test_cli_restore_missing_archive() {
    let dir = TempDir::new().unwrap();

    base_vault_command(dir.path())
        .arg("restore")
        .arg(dir.path().join("nope.tgz"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[cfg(unix)]
#[test]
fn test_cli_restore_with_yes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let ctx = seeded_host(&dir);
    let archive = create_full_backup(&ctx).unwrap().archive_path;
    fs::write(&ctx.live.settings_db, b"changed").unwrap();

    let init_dir = dir.path().join("init.d");
    fs::create_dir_all(&init_dir).unwrap();
    let script = init_dir.join("vnstat");
    fs::write(&script, "#!/bin/sh\necho \"vnstat $1\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    base_vault_command(dir.path())
        .arg("restore")
        .arg(&archive)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("[FOUND]"))
        .stdout(predicate::str::contains("[CLEAN]"));

    assert_eq!(
        fs::read(&ctx.live.settings_db).unwrap(),
        b"speedtest-rows=42"
    );
    assert_eq!(entry_count(&ctx.backup_dir), 1, "staged copy should be gone");
}
