use report_desk::records::{ImplementationItem, Level, Metric, PolicyRecommendation, Record};
use report_desk::storage::MemoryStorage;
use report_desk::template::{create_default_report, DEFAULT_TITLE};
use report_desk::util::format_timestamp;
use report_desk::{LoadOutcome, ReportDocument, ReportStore, StoreError};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nbody";

fn empty_store() -> ReportStore<MemoryStorage> {
    ReportStore::open(MemoryStorage::new())
}

#[test]
fn default_report_scenario() {
    let mut store = empty_store();
    assert!(store.is_empty());

    let id = store.create_report(create_default_report()).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.selected_id(), Some(id.as_str()));
    let doc = store.selected().unwrap();
    assert_eq!(doc.title(), DEFAULT_TITLE);
    assert_eq!(doc.records::<Metric>().len(), 4);
    assert_eq!(doc.images().len(), 0);

    let x = store
        .update_selected(|doc| doc.edit_images(|cat| Ok(cat.add("a.png", PNG.to_vec(), "", "General"))))
        .unwrap();
    assert_eq!(store.selected().unwrap().images().len(), 1);

    let removed = store
        .update_selected(|doc| doc.edit_images(|cat| Ok(cat.remove_by_id(&x))))
        .unwrap();
    assert!(removed);
    assert_eq!(store.selected().unwrap().images().len(), 0);

    let again = store
        .update_selected(|doc| doc.edit_images(|cat| Ok(cat.remove_by_id(&x))))
        .unwrap();
    assert!(!again);
}

#[test]
fn create_appends_and_selects() {
    let mut store = empty_store();
    let a = store.create_default_report().unwrap();
    let b = store.create_report(ReportDocument::new("Second")).unwrap();
    assert_ne!(a, b);
    assert_eq!(store.ids().collect::<Vec<_>>(), [a.as_str(), b.as_str()]);
    assert_eq!(store.selected_id(), Some(b.as_str()));
    assert_eq!(store.get(&b).unwrap().id(), b);
}

#[test]
fn report_ids_stay_unique_after_deletes() {
    let mut store = empty_store();
    let a = store.create_default_report().unwrap();
    let b = store.create_default_report().unwrap();
    store.delete_report(&a).unwrap();
    let c = store.create_default_report().unwrap();
    assert_ne!(b, c);
    assert_eq!(store.len(), 2);
}

#[test]
fn select_unknown_report_fails() {
    let mut store = empty_store();
    let a = store.create_default_report().unwrap();
    let err = store.select_report("nope").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "report", .. }));
    assert_eq!(store.selected_id(), Some(a.as_str()));
}

#[test]
fn deleting_selected_moves_selection_to_first() {
    let mut store = empty_store();
    let a = store.create_default_report().unwrap();
    let b = store.create_default_report().unwrap();
    let c = store.create_default_report().unwrap();
    store.select_report(&b).unwrap();

    store.delete_report(&b).unwrap();
    assert_eq!(store.ids().collect::<Vec<_>>(), [a.as_str(), c.as_str()]);
    assert_eq!(store.selected_id(), Some(a.as_str()));

    store.delete_report(&c).unwrap();
    assert_eq!(store.selected_id(), Some(a.as_str()));
}

#[test]
fn last_report_cannot_be_deleted() {
    let mut store = empty_store();
    let a = store.create_default_report().unwrap();
    let writes = store.storage().writes();

    let err = store.delete_report(&a).unwrap_err();
    assert!(matches!(err, StoreError::LastReport));
    assert_eq!(store.len(), 1);
    assert_eq!(store.selected_id(), Some(a.as_str()));
    assert_eq!(store.storage().writes(), writes);
}

#[test]
fn delete_unknown_report_fails() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    store.create_default_report().unwrap();
    assert!(store.delete_report("missing").unwrap_err().is_not_found());
    assert_eq!(store.len(), 2);
}

#[test]
fn unchanged_setter_does_not_persist() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    let writes = store.storage().writes();
    let stamp = store.selected().unwrap().last_modified();

    let changed = store
        .update_selected(|doc| Ok(doc.set_title(DEFAULT_TITLE)))
        .unwrap();
    assert!(!changed);
    assert_eq!(store.storage().writes(), writes);
    assert_eq!(store.selected().unwrap().last_modified(), stamp);

    assert!(store.update_selected(|doc| Ok(doc.set_title("Renamed"))).unwrap());
    assert_eq!(store.storage().writes(), writes + 1);
}

#[test]
fn nested_edit_persists_whole_store() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    store
        .update_selected(|doc| doc.edit_records::<Metric, _, _>(|c| c.append(Metric::placeholder())))
        .unwrap();
    let saved = store.storage().contents().unwrap().to_string();
    assert!(saved.contains("New Metric"));
    assert!(saved.contains("\"report_1\""));
}

#[test]
fn failed_nested_edit_does_not_persist() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    let writes = store.storage().writes();
    let err = store
        .update_selected(|doc| doc.edit_records::<Metric, _, _>(|c| c.remove_at(99)))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.storage().writes(), writes);
}

#[test]
fn write_failure_propagates_and_keeps_memory() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    store.storage_mut().set_fail_writes(true);

    let err = store
        .update_selected(|doc| Ok(doc.set_title("Unsaved")))
        .unwrap_err();
    assert!(matches!(err, StoreError::StorageWrite { .. }));
    assert_eq!(store.selected().unwrap().title(), "Unsaved");

    store.storage_mut().set_fail_writes(false);
    store.save().unwrap();
    assert!(store.storage().contents().unwrap().contains("Unsaved"));
}

#[test]
fn no_selection_is_reported() {
    let mut store = empty_store();
    let err = store.update_selected(|doc| Ok(doc.set_title("x"))).unwrap_err();
    assert!(matches!(err, StoreError::NoSelection));
}

#[test]
fn ensure_report_seeds_only_when_empty() {
    let mut store = empty_store();
    let seeded = store.ensure_report().unwrap();
    assert!(seeded.is_some());
    assert_eq!(store.ensure_report().unwrap(), None);
    assert_eq!(store.len(), 1);
}

#[test]
fn corrupt_storage_loads_empty() {
    let store = ReportStore::open(MemoryStorage::with_contents("{ this is not json"));
    assert!(store.is_empty());
    assert_eq!(store.selected_id(), None);

    let mut store = ReportStore::new(MemoryStorage::with_contents("[]"));
    assert!(matches!(store.load(), LoadOutcome::Recovered { .. }));
    let mut store = ReportStore::new(MemoryStorage::new());
    assert_eq!(store.load(), LoadOutcome::Fresh);
}

#[test]
fn save_then_load_reproduces_store() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    let second = store.create_report(ReportDocument::new("Second")).unwrap();
    store
        .update_report(&second, |doc| {
            doc.add_finding("only finding");
            doc.edit_images(|cat| Ok(cat.add("chart.png", PNG.to_vec(), "cap", "Charts & Graphs")))
        })
        .unwrap();

    let text = store.export_store().unwrap();
    let mut reloaded = ReportStore::new(MemoryStorage::with_contents(text));
    assert_eq!(reloaded.load(), LoadOutcome::Loaded { reports: 2 });

    let original: Vec<_> = store.reports().collect();
    let restored: Vec<_> = reloaded.reports().collect();
    assert_eq!(original, restored);
    let img = restored[1].images().iter().next().unwrap();
    assert_eq!(img.payload, PNG);
    assert_eq!(reloaded.selected_id(), Some("report_1"));
}

#[test]
fn loads_legacy_shape_with_missing_fields() {
    let raw = r#"{
      "report_1": {
        "title": "Legacy",
        "created_date": "2024-05-01",
        "last_modified": "2024-05-01 10:00:00",
        "summary": {"content": "c", "key_findings": ["f1"]},
        "metrics": [{"label": "L", "value": "1", "trend": "+1"}],
        "implementation_status": [
          {"policy": "P", "status": "Active", "budget": "B", "impact": "High", "completion": 40, "target_date": "2025-06-30"}
        ]
      }
    }"#;
    let store = ReportStore::open(MemoryStorage::with_contents(raw));
    let doc = store.get("report_1").unwrap();
    assert_eq!(doc.title(), "Legacy");
    assert_eq!(doc.summary().key_findings, ["f1"]);
    assert_eq!(doc.records::<Metric>().len(), 1);
    assert!(doc.images().is_empty());
}

#[test]
fn export_images_preserves_format_metadata() {
    let mut store = empty_store();
    let id = store.create_default_report().unwrap();
    store
        .update_selected(|doc| {
            doc.edit_images(|cat| {
                cat.add("photo.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0], "", "General");
                Ok(cat.add("photo.jpg", PNG.to_vec(), "", "General"))
            })
        })
        .unwrap();
    let archive = store.export_images(&id).unwrap();
    let names: Vec<_> = archive.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["photo.jpg", "photo (2).jpg"]);
    assert_eq!(archive.entries[0].content_type, "image/jpeg");
    assert_eq!(archive.entries[1].content_type, "image/png");
    assert!(store.export_images("missing").is_err());
}

const MIXED_STORE: &str = r#"{
  "report_1": {"title": "Keep me", "created_date": "2024-05-01", "last_modified": "2024-05-01 10:00:00"},
  "report_2": {
    "title": "Edited in a grid",
    "created_date": "01/05/2024",
    "last_modified": "2024-05-02T08:30:00",
    "policy_recommendations": [{"title": "T", "priority": "urgent"}],
    "implementation_status": [{"policy": "P", "completion": 85.0, "target_date": "2025-06-30"}]
  },
  "report_3": {"title": "Broken", "metrics": "not a table"}
}"#;

#[test]
fn off_type_fields_load_instead_of_wiping_the_store() {
    let mut store = ReportStore::new(MemoryStorage::with_contents(MIXED_STORE));
    let outcome = store.load();
    assert_eq!(
        outcome,
        LoadOutcome::Partial {
            reports: 2,
            skipped: vec!["report_3".to_string()],
        }
    );
    assert_eq!(store.get("report_1").unwrap().title(), "Keep me");

    let doc = store.get("report_2").unwrap();
    assert_eq!(doc.records::<ImplementationItem>().get(0).unwrap().completion, 85);
    assert_eq!(
        doc.records::<PolicyRecommendation>().get(0).unwrap().priority,
        Level::Medium
    );
    assert_eq!(format_timestamp(&doc.last_modified()), "2024-05-02 08:30:00");
}

#[test]
fn dropped_data_is_preserved_before_first_write() {
    let mut store = ReportStore::open(MemoryStorage::with_contents(MIXED_STORE));
    assert_eq!(store.storage().preserved(), None);

    store.create_report(ReportDocument::new("New")).unwrap();
    assert_eq!(store.storage().preserved(), Some(MIXED_STORE));
    let saved = store.storage().contents().unwrap();
    assert!(saved.contains("Keep me"));
    assert!(!saved.contains("Broken"));

    // Only the first write after the load keeps a copy.
    store.update_selected(|doc| Ok(doc.set_title("Renamed"))).unwrap();
    assert_eq!(store.storage().preserved(), Some(MIXED_STORE));
}

#[test]
fn corrupt_blob_is_preserved_before_overwrite() {
    let mut store = ReportStore::open(MemoryStorage::with_contents("{ this is not json"));
    assert!(store.is_empty());
    store.create_default_report().unwrap();
    assert_eq!(store.storage().preserved(), Some("{ this is not json"));
}

#[test]
fn clean_load_keeps_nothing_aside() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    let text = store.export_store().unwrap();

    let mut reloaded = ReportStore::open(MemoryStorage::with_contents(text));
    reloaded.update_selected(|doc| Ok(doc.set_title("Changed"))).unwrap();
    assert_eq!(reloaded.storage().preserved(), None);
}

#[test]
fn export_single_image_keeps_its_content_type() {
    let mut store = empty_store();
    let report = store.create_default_report().unwrap();
    let (jpeg, png) = store
        .update_selected(|doc| {
            doc.edit_images(|cat| {
                let jpeg = cat.add("../shots/road.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0], "", "");
                let png = cat.add("road.jpg", PNG.to_vec(), "", "");
                Ok((jpeg, png))
            })
        })
        .unwrap();

    let entry = store.export_image(&report, &jpeg).unwrap();
    assert_eq!(entry.name, "road.jpg");
    assert_eq!(entry.content_type, "image/jpeg");
    assert_eq!(entry.bytes, [0xFF, 0xD8, 0xFF, 0xE0]);

    let entry = store.export_image(&report, &png).unwrap();
    assert_eq!(entry.content_type, "image/png");
    assert_eq!(entry.bytes, PNG);

    let err = store.export_image(&report, "missing").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "image", .. }));
    let err = store.export_image("nope", &png).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "report", .. }));
}

#[test]
fn batch_upload_writes_once() {
    let mut store = empty_store();
    store.create_default_report().unwrap();
    let writes = store.storage().writes();

    let ids = store
        .update_selected(|doc| {
            doc.edit_images(|cat| {
                Ok(["a.png", "b.png", "c.png"]
                    .into_iter()
                    .map(|name| cat.add(name, PNG.to_vec(), "", "Charts & Graphs"))
                    .collect::<Vec<_>>())
            })
        })
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(store.selected().unwrap().images().len(), 3);
    assert_eq!(store.storage().writes(), writes + 1);
}
