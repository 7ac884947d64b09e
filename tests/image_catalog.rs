use report_desk::images::{ImageCatalog, ALL_CATEGORIES};
use report_desk::codec::ImageFormat;
use report_desk::StoreError;
use std::collections::HashSet;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

#[test]
fn add_returns_unique_ids() {
    let mut cat = ImageCatalog::default();
    let mut seen = HashSet::new();
    for i in 0..5000 {
        let id = cat.add(&format!("{i}.png"), vec![i as u8], "", "General");
        assert!(seen.insert(id));
    }
    assert_eq!(cat.len(), 5000);
}

#[test]
fn add_appends_and_defaults_category() {
    let mut cat = ImageCatalog::default();
    let a = cat.add("a.png", PNG.to_vec(), "first", "");
    let b = cat.add("b.gif", b"GIF89a".to_vec(), "", "Infrastructure");
    let ids: Vec<_> = cat.iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, [a.clone(), b]);
    let first = cat.get(&a).unwrap();
    assert_eq!(first.category, "General");
    assert_eq!(first.format, ImageFormat::Png);
    assert_eq!(first.content_type(), "image/png");
}

#[test]
fn remove_by_id_is_idempotent() {
    let mut cat = ImageCatalog::default();
    let keep = cat.add("keep.png", PNG.to_vec(), "", "General");
    let x = cat.add("a.png", PNG.to_vec(), "", "General");
    assert!(cat.remove_by_id(&x));
    let rev = cat.revision();
    assert!(!cat.remove_by_id(&x));
    assert_eq!(cat.revision(), rev);
    assert_eq!(cat.len(), 1);
    assert!(cat.get(&keep).is_some());
}

#[test]
fn clear_empties_everything() {
    let mut cat = ImageCatalog::default();
    cat.add("a.png", PNG.to_vec(), "", "General");
    cat.add("b.png", PNG.to_vec(), "", "General");
    assert_eq!(cat.clear(), 2);
    assert!(cat.is_empty());
    assert_eq!(cat.clear(), 0);
}

#[test]
fn update_metadata_only_touches_given_fields() {
    let mut cat = ImageCatalog::default();
    let id = cat.add("a.png", PNG.to_vec(), "old", "General");
    assert!(cat.update_metadata(&id, None, Some("Research Data")).unwrap());
    let e = cat.get(&id).unwrap();
    assert_eq!(e.caption, "old");
    assert_eq!(e.category, "Research Data");
    assert!(!cat.update_metadata(&id, Some("old"), None).unwrap());
}

#[test]
fn update_metadata_on_missing_id_leaves_catalog_alone() {
    let mut cat = ImageCatalog::default();
    let id = cat.add("a.png", PNG.to_vec(), "cap", "General");
    let before = cat.clone();
    let err = cat
        .update_metadata("missing", Some("x"), Some("y"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "image", .. }));
    assert_eq!(cat, before);
    assert_eq!(cat.get(&id).unwrap().caption, "cap");
}

#[test]
fn filter_is_a_live_view() {
    let mut cat = ImageCatalog::default();
    cat.add("a.png", PNG.to_vec(), "", "General");
    cat.add("b.png", PNG.to_vec(), "", "Infrastructure");
    assert_eq!(cat.filter_by_category(ALL_CATEGORIES).count(), 2);
    assert_eq!(cat.filter_by_category("Infrastructure").count(), 1);

    cat.add("c.png", PNG.to_vec(), "", "Infrastructure");
    assert_eq!(cat.filter_by_category("Infrastructure").count(), 2);
    assert_eq!(cat.filter_by_category("Nothing").count(), 0);
    assert_eq!(cat.categories(), ["General", "Infrastructure"]);
}

#[test]
fn export_all_pairs_names_with_bytes() {
    let mut cat = ImageCatalog::default();
    cat.add("a.png", PNG.to_vec(), "", "General");
    cat.add("b.bin", vec![1, 2, 3], "", "General");
    let out = cat.export_all();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], ("a.png", PNG));
    assert_eq!(out[1], ("b.bin", &[1u8, 2, 3][..]));
}

#[test]
fn corrupt_payload_skips_only_that_image() {
    let raw = r#"[
        {"id": "1", "filename": "good.png", "data": "iVBORw0KGgo=", "caption": "", "uploaded_date": "2024-01-02 03:04:05"},
        {"id": "2", "filename": "bad.png", "data": "@@not base64@@", "caption": "", "uploaded_date": "2024-01-02 03:04:05"},
        {"id": "3", "filename": "old.jpg", "data": "/9j/", "caption": "legacy", "uploaded_date": "2024-01-02 03:04:05"}
    ]"#;
    let cat: ImageCatalog = serde_json::from_str(raw).unwrap();
    let ids: Vec<_> = cat.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["1", "3"]);
    let legacy = cat.get("3").unwrap();
    assert_eq!(legacy.category, "General");
    assert_eq!(legacy.format, ImageFormat::Jpeg);
    assert_eq!(cat.get("1").unwrap().format, ImageFormat::Png);
}
