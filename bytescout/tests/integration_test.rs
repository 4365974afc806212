use anyhow::Result;
use bytescout::{scan, CollectingSink, FileReport, ScanConfig};
use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

// Helper function to create test files
fn create_test_files(dir: impl AsRef<Path>, files: &[(&str, &str)]) -> Result<()> {
    for (name, content) in files {
        let path = dir.as_ref().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

fn workers(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn by_path(reports: Vec<FileReport>) -> BTreeMap<PathBuf, (u64, u64)> {
    reports
        .into_iter()
        .map(|r| (r.path, (r.total_bytes, r.entries_count)))
        .collect()
}

#[test]
fn test_every_file_reported_once() -> Result<()> {
    let dir = tempdir()?;
    let mut expected = BTreeMap::new();
    for i in 0..50 {
        let name = format!("d{}/f{}.txt", i % 7, i);
        let content = "ab".repeat(i);
        create_test_files(&dir, &[(name.as_str(), content.as_str())])?;
        expected.insert(dir.path().join(&name), (2 * i as u64, i as u64));
    }

    for n in [1, 2, 4, 16] {
        let sink = Arc::new(CollectingSink::new());
        let config = ScanConfig::new(dir.path(), "ab", workers(n));
        let summary = scan(&config, sink.clone())?;

        let reports = sink.reports();
        assert_eq!(reports.len(), 50, "workers={}", n);
        assert!(reports.iter().all(|r| r.worker < n));
        assert_eq!(by_path(reports), expected, "workers={}", n);

        assert_eq!(summary.files_scanned, 50);
        assert_eq!(summary.dirs_visited, 8);
        assert!(summary.peak_in_flight <= n as u64);
        assert!(summary.is_accounted());
    }
    Ok(())
}

#[test]
fn test_results_independent_of_worker_count() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("a.txt", "xxhelloxx"),
            ("b.txt", "hehehhe"),
            ("nested/c.txt", "hhhhe"),
            ("nested/deeper/d.bin", "e h e"),
        ],
    )?;

    let run = |n: usize| -> Result<BTreeMap<PathBuf, (u64, u64)>> {
        let sink = Arc::new(CollectingSink::new());
        scan(&ScanConfig::new(dir.path(), "he", workers(n)), sink.clone())?;
        Ok(by_path(sink.reports()))
    };

    let single = run(1)?;
    assert_eq!(single[&dir.path().join("a.txt")], (9, 1));
    assert_eq!(single[&dir.path().join("b.txt")], (7, 3));
    assert_eq!(single[&dir.path().join("nested/c.txt")], (5, 1));
    assert_eq!(single[&dir.path().join("nested/deeper/d.bin")], (5, 0));

    // Same answer on every run and for every pool size
    assert_eq!(run(3)?, single);
    assert_eq!(run(8)?, single);
    Ok(())
}

#[test]
fn test_empty_tree() -> Result<()> {
    let dir = tempdir()?;
    let sink = Arc::new(CollectingSink::new());

    let summary = scan(&ScanConfig::new(dir.path(), "he", workers(4)), sink.clone())?;
    assert!(sink.reports().is_empty());
    assert!(sink.errors().is_empty());
    assert_eq!(summary.files_dispatched, 0);
    assert_eq!(summary.dirs_visited, 1);
    Ok(())
}

#[test]
fn test_more_workers_than_files() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("only.txt", "he")])?;

    let sink = Arc::new(CollectingSink::new());
    let summary = scan(&ScanConfig::new(dir.path(), "he", workers(32)), sink.clone())?;
    assert_eq!(sink.reports().len(), 1);
    assert_eq!(summary.peak_in_flight, 1);
    Ok(())
}

#[test]
fn test_pattern_longer_than_files() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("short.txt", "abc"), ("empty.txt", "")])?;

    let sink = Arc::new(CollectingSink::new());
    scan(
        &ScanConfig::new(dir.path(), "abcdefgh", workers(2)),
        sink.clone(),
    )?;

    let reports = by_path(sink.reports());
    assert_eq!(reports[&dir.path().join("short.txt")], (3, 0));
    assert_eq!(reports[&dir.path().join("empty.txt")], (0, 0));
    Ok(())
}

#[test]
fn test_filters_from_config() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("src/main.rs", "fn fn"),
            ("src/notes.md", "fn"),
            ("target/debug/build.rs", "fn"),
        ],
    )?;

    let config = ScanConfig {
        ignore_patterns: vec!["*/target".to_string()],
        file_extensions: Some(vec!["rs".to_string()]),
        ..ScanConfig::new(dir.path(), "fn", workers(2))
    };
    let sink = Arc::new(CollectingSink::new());
    scan(&config, sink.clone())?;

    let reports = by_path(sink.reports());
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[&dir.path().join("src/main.rs")], (5, 2));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[("open/a.txt", "he"), ("locked/b.txt", "he"), ("c.txt", "he")],
    )?;
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

    // Root ignores permission bits, nothing to observe
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        return Ok(());
    }

    let sink = Arc::new(CollectingSink::new());
    let result = scan(&ScanConfig::new(dir.path(), "he", workers(2)), sink.clone());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
    let summary = result?;

    let reports = by_path(sink.reports());
    assert_eq!(reports.len(), 2);
    assert!(reports.contains_key(&dir.path().join("open/a.txt")));
    assert!(reports.contains_key(&dir.path().join("c.txt")));

    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("cannot read directory"));
    assert_eq!(summary.dir_errors, 1);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir()?;
    create_test_files(&dir, &[("secret.txt", "he"), ("public.txt", "he he")])?;
    let secret = dir.path().join("secret.txt");
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000))?;

    if fs::File::open(&secret).is_ok() {
        return Ok(());
    }

    let sink = Arc::new(CollectingSink::new());
    let summary = scan(&ScanConfig::new(dir.path(), "he", workers(2)), sink.clone())?;

    let reports = by_path(sink.reports());
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[&dir.path().join("public.txt")], (5, 2));
    assert_eq!(sink.errors().len(), 1);
    assert!(sink.errors()[0].starts_with("cannot open"));
    assert_eq!(summary.files_failed, 1);
    assert!(summary.is_accounted());
    Ok(())
}

#[test]
fn test_large_file_across_buffer_boundaries() -> Result<()> {
    let dir = tempdir()?;
    let mut content = vec![b'x'; 200 * 1024];
    // Straddles the 64 KiB read boundaries
    for at in [65_535usize, 131_071, 196_607] {
        content[at..at + 2].copy_from_slice(b"ab");
    }
    fs::write(dir.path().join("big.bin"), &content)?;

    let sink = Arc::new(CollectingSink::new());
    scan(&ScanConfig::new(dir.path(), "ab", workers(1)), sink.clone())?;

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].total_bytes, 200 * 1024);
    assert_eq!(reports[0].entries_count, 3);
    Ok(())
}
