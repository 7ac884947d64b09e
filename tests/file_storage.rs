use report_desk::storage::{FileStorage, Storage};
use report_desk::{LoadOutcome, ReportStore};

#[test]
fn missing_file_is_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::new(FileStorage::new(dir.path().join("data.json"), true));
    assert_eq!(store.load(), LoadOutcome::Fresh);
}

#[test]
fn round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data.json");

    let mut store = ReportStore::open(FileStorage::new(&path, true));
    let id = store.create_default_report().unwrap();
    store
        .update_selected(|doc| {
            doc.edit_images(|cat| Ok(cat.add("x.bmp", b"BM\x00\x01\x02".to_vec(), "", "")))
        })
        .unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reopened = ReportStore::open(FileStorage::new(&path, true));
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.get(&id), store.get(&id));
    let img = reopened.get(&id).unwrap().images().iter().next().unwrap();
    assert_eq!(img.payload, b"BM\x00\x01\x02");
    assert_eq!(img.content_type(), "image/bmp");
}

#[test]
fn direct_overwrite_also_works() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let mut storage = FileStorage::new(&path, false);
    storage.write("{}").unwrap();
    storage.write("{\"a\":1}").unwrap();
    assert_eq!(storage.read().unwrap().as_deref(), Some("{\"a\":1}"));
}

#[test]
fn garbage_on_disk_recovers_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, "\u{0}\u{1}garbage").unwrap();
    let mut store = ReportStore::new(FileStorage::new(&path, true));
    assert!(matches!(store.load(), LoadOutcome::Recovered { .. }));
    assert!(store.is_empty());
}

#[test]
fn unreadable_path_recovers_empty() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be.
    let mut store = ReportStore::new(FileStorage::new(dir.path(), true));
    assert!(matches!(store.load(), LoadOutcome::Recovered { .. }));
}

#[test]
fn unreadable_file_is_copied_aside_before_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, "{ truncated").unwrap();

    let storage = FileStorage::new(&path, true);
    let backup = storage.preserved_path();
    assert_eq!(backup, dir.path().join("data.json.corrupt"));

    let mut store = ReportStore::open(storage);
    assert!(!backup.exists());
    store.create_default_report().unwrap();

    assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{ truncated");
    let reopened = ReportStore::open(FileStorage::new(&path, true));
    assert_eq!(reopened.len(), 1);
}
