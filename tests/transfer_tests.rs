
use ranet_vault::archive::create_full_backup;
use ranet_vault::collaborators::LocalTransport;
use ranet_vault::config::VaultContext;
use ranet_vault::errors::{AppError, ArchiveError};
use ranet_vault::ops::{backup_and_send, stage_restore, RestoreOrchestrator, RestoreOutcome};
use std::fs;
use tempfile::TempDir;
use test_helpers::{entry_count, seed_live, FakeService, RecordingSink};

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_backup_and_send_removes_local_archive() {
    let dir = TempDir::new().unwrap();
    let ctx = VaultContext::rooted_at(dir.path());
    seed_live(&ctx, b"speedtest-rows=42", &[("interfaces/eth0.db", b"x")]);
    let outbox = dir.path().join("outbox");
    let transport = LocalTransport::new(None, &outbox);

    let report = backup_and_send(&ctx, &transport).await.unwrap();

    assert!(!report.archive_path.exists());
    assert_eq!(entry_count(&ctx.backup_dir), 0);
    let sent = file_names(&outbox);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("ranet-backup-"));
    assert!(sent[0].ends_with(".tgz"));
    assert_eq!(
        fs::metadata(outbox.join(&sent[0])).unwrap().len(),
        report.archive_size
    );
}

#[tokio::test]
async fn test_stage_then_discard() {
    let dir = TempDir::new().unwrap();
    let source = VaultContext::rooted_at(&dir.path().join("source"));
    seed_live(&source, b"rows", &[("vnstat.db", b"db")]);
    let archive = create_full_backup(&source).unwrap().archive_path;

    let target = VaultContext::rooted_at(&dir.path().join("target"));
    let transport = LocalTransport::new(Some(archive.clone()), dir.path().join("outbox"));
    let staged = stage_restore(&target, &transport).await.unwrap();

    assert!(staged.path.starts_with(&target.backup_dir));
    let name = staged.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("restore-"), "{}", name);
    assert_eq!(staged.size_bytes, fs::metadata(&archive).unwrap().len());
    assert!(staged
        .preview
        .entries
        .iter()
        .any(|e| e == "opt/ranet-bot/speedtest.db"));

    let staged_path = staged.path.clone();
    staged.discard().unwrap();
    assert!(!staged_path.exists());
    assert!(archive.is_file(), "the received file itself is not ours to delete");
    assert!(!target.live.settings_db.exists());
}

#[tokio::test]
async fn test_stage_then_apply() {
    let dir = TempDir::new().unwrap();
    let source = VaultContext::rooted_at(&dir.path().join("source"));
    seed_live(&source, b"speedtest-rows=42", &[("interfaces/eth0.db", b"eth0")]);
    let archive = create_full_backup(&source).unwrap().archive_path;

    let target = VaultContext::rooted_at(&dir.path().join("target"));
    let transport = LocalTransport::new(Some(archive), dir.path().join("outbox"));
    let staged = stage_restore(&target, &transport).await.unwrap();
    let staged_path = staged.path.clone();

    let service = FakeService::new();
    let sink = RecordingSink::new();
    let orchestrator = RestoreOrchestrator::new(&target, &service, &sink);
    let report = staged.apply(&orchestrator).await;

    assert_eq!(report.outcome, RestoreOutcome::Completed);
    assert!(report.is_clean(), "log:\n{}", report.render());
    assert!(!staged_path.exists());
    assert_eq!(
        fs::read(&target.live.settings_db).unwrap(),
        b"speedtest-rows=42"
    );
}

#[tokio::test]
async fn test_stage_rejects_wrong_extension() {
    let dir = TempDir::new().unwrap();
    let ctx = VaultContext::rooted_at(dir.path());
    let incoming = dir.path().join("backup.zip");
    fs::write(&incoming, b"PK").unwrap();
    let transport = LocalTransport::new(Some(incoming), dir.path().join("outbox"));

    let result = stage_restore(&ctx, &transport).await;

    assert!(matches!(
        result,
        Err(AppError::Archive(ArchiveError::WrongExtension { .. }))
    ));
    assert_eq!(entry_count(&ctx.backup_dir), 0);
}

#[tokio::test]
async fn test_stage_removes_unreadable_archive() {
    let dir = TempDir::new().unwrap();
    let ctx = VaultContext::rooted_at(dir.path());
    let incoming = dir.path().join("broken.tgz");
    fs::write(&incoming, b"not a tarball").unwrap();
    let transport = LocalTransport::new(Some(incoming), dir.path().join("outbox"));

    let result = stage_restore(&ctx, &transport).await;

    assert!(matches!(
        result,
        Err(AppError::Archive(ArchiveError::Unreadable { .. }))
    ));
    assert_eq!(entry_count(&ctx.backup_dir), 0);
}

#[tokio::test]
async fn test_stage_without_incoming_is_a_transport_error() {
    let dir = TempDir::new().unwrap();
    let ctx = VaultContext::rooted_at(dir.path());
    let transport = LocalTransport::new(None, dir.path().join("outbox"));

    let result = stage_restore(&ctx, &transport).await;

    assert!(matches!(result, Err(AppError::Transport(_))));
}
