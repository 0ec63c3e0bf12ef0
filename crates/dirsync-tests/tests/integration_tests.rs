//! Integration tests for dirsync
//!
//! Every test runs a full synchronization against real directories on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirsync_engine::{
    IdentityPolicy, LocalFs, MemoryFs, RecordingSink, SyncJob, SyncOptions, SyncPhase,
    Synchronizer,
};
use dirsync_tests::test_utils::{
    create_tree, list_tree, mtime, timestamp, write_file_with_mtime, SyncFixture,
};
use dirsync_types::{Error, SyncAction};
use proptest::prelude::*;
use rstest::rstest;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_new_file_propagates_with_mtime() -> TestResult {
    let fixture = SyncFixture::new()?;
    let source_file = fixture.source().join("a.txt");
    write_file_with_mtime(&source_file, "hello", timestamp(1_700_000_000))?;

    let report = SyncJob::new(fixture.source(), fixture.target(), false).run()?;

    let target_file = fixture.target().join("a.txt");
    assert_eq!(fs::read_to_string(&target_file)?, "hello");
    assert_eq!(mtime(&target_file)?, mtime(&source_file)?);
    assert_eq!(report.stats.files_copied, 1);
    assert!(report.is_clean());
    Ok(())
}

#[test]
fn test_updated_file_is_recopied() -> TestResult {
    let fixture = SyncFixture::new()?;
    let source_file = fixture.source().join("a.txt");
    let target_file = fixture.target().join("a.txt");

    write_file_with_mtime(&source_file, "old", timestamp(1_600_000_000))?;
    SyncJob::new(fixture.source(), fixture.target(), false).run()?;
    assert_eq!(fs::read_to_string(&target_file)?, "old");

    let t1 = timestamp(1_700_000_000);
    write_file_with_mtime(&source_file, "new", t1)?;
    let report = SyncJob::new(fixture.source(), fixture.target(), false).run()?;

    assert_eq!(fs::read_to_string(&target_file)?, "new");
    assert_eq!(mtime(&target_file)?, t1);
    assert_eq!(report.stats.files_copied, 1);
    Ok(())
}

#[test]
fn test_resync_is_idempotent() -> TestResult {
    let fixture = SyncFixture::new()?;
    create_tree(&fixture.source(), 25, 64)?;
    fs::create_dir_all(fixture.source().join("empty/nested"))?;
    write_file_with_mtime(&fixture.target().join("stale.txt"), "x", timestamp(1))?;

    let first = SyncJob::new(fixture.source(), fixture.target(), true).run()?;
    let after_first = list_tree(&fixture.target())?;
    let second = SyncJob::new(fixture.source(), fixture.target(), true).run()?;

    assert!(first.is_clean());
    assert_eq!(first.stats.files_copied, 25);
    assert_eq!(after_first, list_tree(&fixture.source())?);
    assert_eq!(list_tree(&fixture.target())?, after_first);
    assert!(second.outcomes.is_empty());
    assert_eq!(second.stats.files_unchanged, 25);
    assert_eq!(second.stats.total_changes(), 0);
    Ok(())
}

#[rstest]
#[case::enabled(true)]
#[case::disabled(false)]
fn test_keep_and_remove(#[case] delete_missing: bool) -> TestResult {
    let fixture = SyncFixture::new()?;
    write_file_with_mtime(&fixture.source().join("keep.txt"), "keep", timestamp(10))?;
    write_file_with_mtime(&fixture.target().join("remove.txt"), "remove", timestamp(10))?;
    write_file_with_mtime(&fixture.target().join("old/deep/x.bin"), "x", timestamp(10))?;

    SyncJob::new(fixture.source(), fixture.target(), delete_missing).run()?;

    assert!(fixture.target().join("keep.txt").exists());
    assert_eq!(fixture.target().join("remove.txt").exists(), !delete_missing);
    assert_eq!(fixture.target().join("old").exists(), !delete_missing);
    Ok(())
}

#[test]
fn test_target_file_with_source_counterpart_is_never_removed() -> TestResult {
    let fixture = SyncFixture::new()?;
    write_file_with_mtime(&fixture.source().join("docs/a.md"), "a", timestamp(5))?;
    write_file_with_mtime(&fixture.target().join("docs/a.md"), "a", timestamp(5))?;
    write_file_with_mtime(&fixture.target().join("docs/b.md"), "b", timestamp(5))?;

    let report = SyncJob::new(fixture.source(), fixture.target(), true).run()?;

    assert!(fixture.target().join("docs/a.md").exists());
    assert!(!fixture.target().join("docs/b.md").exists());
    assert_eq!(report.stats.files_removed, 1);
    assert_eq!(report.stats.files_unchanged, 1);
    Ok(())
}

#[test]
fn test_missing_source_root_is_an_error() -> TestResult {
    let fixture = SyncFixture::new()?;
    write_file_with_mtime(&fixture.target().join("precious.txt"), "p", timestamp(5))?;

    let err = SyncJob::new(fixture.outside("no-such-dir"), fixture.target(), true)
        .run()
        .unwrap_err();

    assert!(matches!(err, Error::SourceRoot { .. }));
    assert!(fixture.target().join("precious.txt").exists());
    Ok(())
}

#[test]
fn test_missing_target_root_is_created() -> TestResult {
    let fixture = SyncFixture::new()?;
    write_file_with_mtime(&fixture.source().join("sub/a.txt"), "a", timestamp(5))?;
    let target = fixture.outside("fresh/target");

    let report = SyncJob::new(fixture.source(), &target, false).run()?;

    assert_eq!(fs::read_to_string(target.join("sub/a.txt"))?, "a");
    assert_eq!(report.stats.dirs_created, 2);
    Ok(())
}

#[test]
fn test_kind_mismatch_is_reported_not_fatal() -> TestResult {
    let fixture = SyncFixture::new()?;
    write_file_with_mtime(&fixture.source().join("thing"), "file", timestamp(5))?;
    write_file_with_mtime(&fixture.source().join("other.txt"), "o", timestamp(5))?;
    fs::create_dir_all(fixture.target().join("thing/inside"))?;

    let report = SyncJob::new(fixture.source(), fixture.target(), true).run()?;

    let failed: Vec<_> = report.failures().map(|o| (o.path.clone(), o.action)).collect();
    assert_eq!(failed, vec![(PathBuf::from("thing"), SyncAction::CopyFile)]);
    // The directory stays, but what it holds has no source counterpart
    assert!(fixture.target().join("thing").is_dir());
    assert!(!fixture.target().join("thing/inside").exists());
    assert_eq!(report.stats.dirs_removed, 1);
    assert!(fixture.target().join("other.txt").exists());
    Ok(())
}

#[test]
fn test_dry_run_leaves_target_untouched() -> TestResult {
    let fixture = SyncFixture::new()?;
    create_tree(&fixture.source(), 5, 16)?;
    write_file_with_mtime(&fixture.target().join("stale.txt"), "x", timestamp(1))?;
    let before = list_tree(&fixture.target())?;

    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::mirror()
    };
    let report = SyncJob::new(fixture.source(), fixture.target(), true)
        .with_options(options)
        .run()?;

    assert!(report.dry_run);
    assert_eq!(report.stats.files_copied, 5);
    assert_eq!(report.stats.files_removed, 1);
    assert_eq!(list_tree(&fixture.target())?, before);
    Ok(())
}

#[test]
fn test_modify_window_skips_close_mtimes() -> TestResult {
    let fixture = SyncFixture::new()?;
    write_file_with_mtime(&fixture.source().join("a.txt"), "same", timestamp(1_000))?;
    write_file_with_mtime(&fixture.target().join("a.txt"), "same", timestamp(1_001))?;

    let options = SyncOptions {
        identity: IdentityPolicy::with_tolerance(Duration::from_secs(2)),
        ..SyncOptions::default()
    };
    let report = SyncJob::new(fixture.source(), fixture.target(), false)
        .with_options(options)
        .run()?;

    assert_eq!(report.stats.files_unchanged, 1);
    assert_eq!(mtime(&fixture.target().join("a.txt"))?, timestamp(1_001));
    Ok(())
}

#[test]
fn test_events_reach_the_sink() -> TestResult {
    let fixture = SyncFixture::new()?;
    write_file_with_mtime(&fixture.source().join("dir/new.txt"), "n", timestamp(5))?;
    write_file_with_mtime(&fixture.target().join("gone.txt"), "g", timestamp(5))?;

    let job = SyncJob::new(fixture.source(), fixture.target(), true);
    let mut sink = RecordingSink::new();
    let report = Synchronizer::new(LocalFs, &mut sink).run(&job)?;

    assert_eq!(
        sink.phases(),
        &[SyncPhase::ForwardSync, SyncPhase::Cleanup, SyncPhase::Done]
    );
    assert_eq!(
        sink.locations(SyncAction::CreateDir),
        vec![fixture.target().join("dir").as_path()]
    );
    assert_eq!(
        sink.locations(SyncAction::CopyFile),
        vec![fixture.target().join("dir/new.txt").as_path()]
    );
    assert_eq!(
        sink.locations(SyncAction::RemoveFile),
        vec![fixture.target().join("gone.txt").as_path()]
    );
    assert_eq!(sink.events().len(), report.outcomes.len());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_directory_is_skipped() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    let fixture = SyncFixture::new()?;
    let locked = fixture.source().join("locked");
    write_file_with_mtime(&locked.join("secret.txt"), "s", timestamp(5))?;
    write_file_with_mtime(&fixture.source().join("open.txt"), "o", timestamp(5))?;
    write_file_with_mtime(&fixture.target().join("locked/secret.txt"), "s", timestamp(5))?;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

    // Privileged users can read the directory anyway
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        return Ok(());
    }

    let result = SyncJob::new(fixture.source(), fixture.target(), true).run();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
    let report = result?;

    let failed: Vec<_> = report.failures().map(|o| (o.path.clone(), o.action)).collect();
    assert_eq!(failed, vec![(PathBuf::from("locked"), SyncAction::Access)]);
    assert!(fixture.target().join("open.txt").exists());
    assert!(fixture.target().join("locked/secret.txt").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_target_symlink_is_unlinked_not_followed() -> TestResult {
    use std::os::unix::fs::symlink;

    let fixture = SyncFixture::new()?;
    let precious = fixture.outside("precious");
    let shared = fixture.outside("shared");
    write_file_with_mtime(&precious.join("data.txt"), "keep me", timestamp(5))?;
    fs::create_dir_all(&shared)?;
    write_file_with_mtime(&fixture.source().join("shared/new.txt"), "n", timestamp(5))?;
    symlink(&precious, fixture.target().join("link"))?;
    symlink(&shared, fixture.target().join("shared"))?;

    let options = SyncOptions {
        follow_symlinks: true,
        ..SyncOptions::mirror()
    };
    let report = SyncJob::new(fixture.source(), fixture.target(), true)
        .with_options(options)
        .run()?;

    // Nothing outside the target root is touched
    assert_eq!(fs::read_to_string(precious.join("data.txt"))?, "keep me");
    assert!(!shared.join("new.txt").exists());
    // The stray link itself is removed
    assert!(fs::symlink_metadata(fixture.target().join("link")).is_err());
    let failed: Vec<_> = report.failures().map(|o| (o.path.clone(), o.action)).collect();
    assert_eq!(failed, vec![(PathBuf::from("shared"), SyncAction::CreateDir)]);
    assert_eq!(report.stats.files_removed, 1);
    Ok(())
}

fn file_set() -> impl Strategy<Value = Vec<(PathBuf, u8)>> {
    let file = (prop::collection::vec("d[0-2]", 0..3), "f[0-3]", any::<u8>()).prop_map(
        |(dirs, leaf, size)| {
            let mut path: PathBuf = dirs.iter().collect();
            path.push(leaf);
            (path, size)
        },
    );
    prop::collection::vec(file, 0..16)
}

fn populate(fs: &mut MemoryFs, root: &str, files: &[(PathBuf, u8)], fill: u8, base: u64) {
    fs.add_dir(root);
    for (path, size) in files {
        fs.add_file(
            Path::new(root).join(path),
            vec![fill; usize::from(*size)],
            timestamp(base + u64::from(*size)),
        );
    }
}

proptest! {
    #[test]
    fn test_mirror_converges_in_one_run(
        source_files in file_set(),
        target_files in file_set(),
    ) {
        let mut fs = MemoryFs::new();
        populate(&mut fs, "/src", &source_files, b's', 1_000);
        populate(&mut fs, "/dst", &target_files, b't', 0);

        let job = SyncJob::new("/src", "/dst", true);
        let first = Synchronizer::new(&mut fs, RecordingSink::new()).run(&job).unwrap();

        prop_assert!(first.is_clean());
        prop_assert_eq!(fs.paths_under("/dst"), fs.paths_under("/src"));
        for (path, _) in &source_files {
            let target = Path::new("/dst").join(path);
            prop_assert_eq!(fs.read(&target), fs.read(Path::new("/src").join(path)));
            prop_assert_eq!(fs.modified(&target), fs.modified(Path::new("/src").join(path)));
        }

        let second = Synchronizer::new(&mut fs, RecordingSink::new()).run(&job).unwrap();
        prop_assert!(second.outcomes.is_empty());
    }
}
