//! Watch-list persistence and merge tests

use tempfile::TempDir;

use whale_sentinel::watchlist::{merge_watchlist, WatchListStore};

use crate::support::address;

fn store() -> (WatchListStore, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = WatchListStore::new(temp_dir.path().join("state").join("watchlist.json"));
    (store, temp_dir)
}

#[test]
fn test_missing_file_loads_empty() {
    let (store, _dir) = store();
    assert!(store.load().is_empty());
}

#[test]
fn test_corrupt_file_loads_empty() {
    let (store, _dir) = store();
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "{ not json").unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn test_save_then_load() {
    let (store, _dir) = store();
    let wallets = vec![address(1), address(2)];

    store.save(&wallets).unwrap();
    assert_eq!(store.load(), wallets);

    // no temp file left behind
    let leftovers: Vec<_> = std::fs::read_dir(store.path().parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_load_normalizes_entries() {
    let (store, _dir) = store();
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    let mixed = format!(
        r#"["{}", "not-an-address", "{}"]"#,
        address(0xab).to_uppercase().replace("0X", "0x"),
        address(0xab)
    );
    std::fs::write(store.path(), mixed).unwrap();

    assert_eq!(store.load(), vec![address(0xab)]);
}

#[test]
fn test_merge_is_idempotent() {
    let existing = vec![address(1)];
    let discovered = vec![address(2), address(3)];

    let (once, first) = merge_watchlist(&existing, &discovered);
    let (twice, second) = merge_watchlist(&once, &discovered);

    assert_eq!(once, twice);
    assert_eq!(first.added, vec![address(2), address(3)]);
    assert!(second.added.is_empty());
    assert_eq!(second.total, 3);
}

#[test]
fn test_merge_keeps_existing_order_and_entries() {
    let existing = vec![address(9), address(1)];
    let (merged, result) = merge_watchlist(&existing, &[address(5), address(9)]);

    assert_eq!(merged, vec![address(9), address(1), address(5)]);
    assert_eq!(result.added, vec![address(5)]);
    assert!(result.changed());
}

#[test]
fn test_merge_with_empty_discovery() {
    let existing = vec![address(1), address(2)];
    let (merged, result) = merge_watchlist(&existing, &[]);
    assert_eq!(merged, existing);
    assert!(!result.changed());
}
