mod common;

use claimtree_core::http::HttpDocumentService;
use claimtree_core::memory::{DeletePolicy, InMemoryDocuments, ListShape};
use claimtree_core::{
    BulkMsg, DocumentNode, Error, Explorer, FileUpload, NodeId, PreviewContent, ValidationError,
};
use common::{claim, recorded_sample, sample_nodes, Recording};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn ids(nodes: impl IntoIterator<Item = impl std::borrow::Borrow<DocumentNode>>) -> Vec<String> {
    nodes.into_iter().map(|n| n.borrow().id.0.clone()).collect()
}

#[test]
fn flat_listing_end_to_end() {
    let c = claim();
    let svc = InMemoryDocuments::with_nodes(vec![
        DocumentNode::folder("1", &c, None, "Docs"),
        DocumentNode::file("2", &c, Some("1"), "a.pdf"),
    ]);
    let mut explorer = Explorer::open(svc, c).unwrap();
    assert_eq!(ids(explorer.contents().items()), vec!["1"]);

    assert!(explorer.navigate_to_folder(Some(&"1".into())));
    assert_eq!(ids(explorer.contents().items()), vec!["2"]);
}

#[test]
fn nested_and_flat_listings_agree() {
    let flat = Explorer::open(InMemoryDocuments::with_nodes(sample_nodes()), claim()).unwrap();
    let nested = Explorer::open(
        InMemoryDocuments::with_nodes(sample_nodes()).list_shape(ListShape::Nested),
        claim(),
    )
    .unwrap();
    assert_eq!(ids(flat.tree().iter()), ids(nested.tree().iter()));
}

#[test]
fn blank_rename_is_never_dispatched() {
    let svc = recorded_sample();
    let mut explorer = Explorer::open(svc.clone(), claim()).unwrap();

    let err = explorer.rename(&"f1".into(), "   ").unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(ValidationError::EmptyName)));
    assert!(svc.mutations().is_empty());

    explorer.rename(&"f1".into(), "  Report  ").unwrap();
    assert_eq!(svc.mutations(), vec!["rename f1 Report"]);
    assert_eq!(
        explorer.tree().get(&"f1".into()).map(|n| n.name.as_str()),
        Some("Report")
    );
}

#[test]
fn every_mutation_reloads() {
    let svc = recorded_sample();
    let mut explorer = Explorer::open(svc.clone(), claim()).unwrap();
    explorer.create_folder(None, "Receipts").unwrap();
    explorer.delete(&"r1".into()).unwrap();

    let calls = svc.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls[0].starts_with("list"));
    assert!(calls[1].starts_with("create_folder"));
    assert!(calls[2].starts_with("list"));
    assert!(calls[3].starts_with("delete"));
    assert!(calls[4].starts_with("list"));

    let root: Vec<_> = explorer.contents().items().map(|n| n.name.clone()).collect();
    assert_eq!(root, vec!["Invoices", "Receipts"]);
}

#[test]
fn moving_a_folder_into_its_descendant_is_rejected() {
    let svc = recorded_sample();
    let mut explorer = Explorer::open(svc.clone(), claim()).unwrap();

    let err = explorer
        .move_node(&"A".into(), Some(&"C".into()))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ValidationFailed(ValidationError::MoveIntoDescendant { .. })
    ));
    assert!(svc.mutations().is_empty());

    explorer.move_node(&"C".into(), None).unwrap();
    assert_eq!(svc.mutations(), vec!["move C None"]);
    assert_eq!(ids(explorer.contents().folders), vec!["A", "C"]);
}

#[test]
fn create_folder_validates_name_and_parent() {
    let svc = recorded_sample();
    let mut explorer = Explorer::open(svc.clone(), claim()).unwrap();

    assert!(explorer.create_folder(None, "").unwrap_err().is_validation());
    assert!(explorer
        .create_folder(Some(&"r1".into()), "Inside a file")
        .unwrap_err()
        .is_validation());
    assert!(svc.mutations().is_empty());

    let created = explorer.create_folder(Some(&"B".into()), " April ").unwrap();
    assert_eq!(created.name, "April");
    explorer.navigate_to_folder(Some(&"B".into()));
    let names: Vec<_> = explorer.contents().folders.iter().map(|n| n.name.clone()).collect();
    assert_eq!(names, vec!["March", "April"]);
}

#[test]
fn failed_request_leaves_state_alone() {
    let inner = Arc::new(InMemoryDocuments::with_nodes(sample_nodes()));
    let mut explorer = Explorer::open(inner.clone(), claim()).unwrap();
    explorer.navigate_to_folder(Some(&"C".into()));
    explorer.toggle(&"f1".into(), true);
    let view = explorer.view().clone();

    inner.fail_on("f1");
    let err = explorer.rename(&"f1".into(), "renamed").unwrap_err();
    assert!(matches!(err, Error::RequestFailed { status: 500, .. }));
    assert_eq!(explorer.view(), &view);
    assert_eq!(
        explorer.tree().get(&"f1".into()).map(|n| n.name.as_str()),
        Some("inv-001.pdf")
    );
}

#[test]
fn deleting_the_current_folder_without_cascade() {
    let inner = Arc::new(
        InMemoryDocuments::with_nodes(sample_nodes()).delete_policy(DeletePolicy::Orphan),
    );
    let mut explorer = Explorer::open(inner.clone(), claim()).unwrap();
    explorer.navigate_to_folder(Some(&"C".into()));

    // Someone else removes "C" while we are looking at it.
    use claimtree_core::DocumentService;
    inner.delete(&"C".into()).unwrap();
    explorer.reload().unwrap();

    assert_eq!(explorer.current_folder(), Some(NodeId::from("B")));
    let orphans = ids(explorer.tree().orphans());
    assert_eq!(orphans, vec!["f1", "f2", "img"]);
    assert!(explorer.contents().is_empty());
}

#[test]
fn bulk_delete_reports_each_item() {
    let inner = Arc::new(InMemoryDocuments::with_nodes(sample_nodes()));
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut explorer = Explorer::open(inner.clone(), claim())
        .unwrap()
        .with_progress(tx);
    explorer.navigate_to_folder(Some(&"C".into()));
    explorer.select_all(true);
    inner.fail_on("f2");

    let report = explorer.bulk_delete().unwrap();
    assert_eq!(ids_of(&report.succeeded), vec!["f1", "img"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, NodeId::from("f2"));
    assert!(!report.is_complete());

    assert!(explorer.view().selected.is_empty());
    assert_eq!(ids(explorer.contents().items()), vec!["f2"]);

    let msgs: Vec<BulkMsg> = rx.try_iter().collect();
    assert_eq!(msgs.first(), Some(&BulkMsg::Started { total: 3 }));
    assert_eq!(
        msgs.last(),
        Some(&BulkMsg::Finished {
            succeeded: 2,
            failed: 1
        })
    );
    assert_eq!(msgs.len(), 5);
}

fn ids_of(ids: &[NodeId]) -> Vec<&str> {
    ids.iter().map(NodeId::as_str).collect()
}

#[test]
fn bulk_operations_need_a_selection() {
    let mut explorer =
        Explorer::open(InMemoryDocuments::with_nodes(sample_nodes()), claim()).unwrap();
    assert!(matches!(
        explorer.bulk_delete(),
        Err(Error::ValidationFailed(ValidationError::EmptySelection))
    ));

    explorer.navigate_to_folder(Some(&"A".into()));
    explorer.select_all(true);
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        explorer.bulk_download(dir.path()),
        Err(Error::ValidationFailed(ValidationError::NoFilesSelected))
    ));
}

#[test]
fn bulk_download_writes_selected_files() {
    let c = claim();
    let inner = Arc::new(InMemoryDocuments::new());
    let mut explorer = Explorer::open(inner.clone(), c).unwrap();
    explorer.create_folder(None, "Sub").unwrap();
    let report = explorer
        .upload_files(
            None,
            &[
                FileUpload::new("a.txt", b"alpha".to_vec()),
                FileUpload::new("b.csv", b"x,y\n".to_vec()),
            ],
        )
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.succeeded.len(), 2);

    explorer.select_all(true);
    assert_eq!(explorer.view().selected.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let report = explorer.bulk_download(dir.path()).unwrap();
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(dir.path().join("b.csv")).unwrap(), b"x,y\n");
    assert!(!dir.path().join("Sub").exists());
}

#[test]
fn bulk_download_keeps_files_with_the_same_name() {
    let mut explorer = Explorer::open(InMemoryDocuments::new(), claim()).unwrap();
    explorer
        .upload_files(
            None,
            &[
                FileUpload::new("invoice.pdf", b"first".to_vec()),
                FileUpload::new("invoice.pdf", b"second".to_vec()),
                FileUpload::new("INVOICE.pdf", b"third".to_vec()),
            ],
        )
        .unwrap();
    explorer.select_all(true);

    let dir = tempfile::tempdir().unwrap();
    let report = explorer.bulk_download(dir.path()).unwrap();
    assert_eq!(report.succeeded.len(), 3);
    assert!(report.is_complete());

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 3);
    let mut contents: Vec<Vec<u8>> = names
        .iter()
        .map(|n| std::fs::read(dir.path().join(n)).unwrap())
        .collect();
    contents.sort();
    assert_eq!(
        contents,
        vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
    );
}

#[test]
fn bulk_delete_keeps_report_when_reload_fails() {
    let svc = recorded_sample();
    let mut explorer = Explorer::open(svc.clone(), claim()).unwrap();
    explorer.navigate_to_folder(Some(&"C".into()));
    explorer.select_all(true);
    let before = explorer.view().clone();
    svc.break_listing();

    let report = explorer.bulk_delete().unwrap();
    assert_eq!(ids_of(&report.succeeded), vec!["f1", "f2", "img"]);
    assert!(report.failed.is_empty());
    assert!(report.reload_error.is_some());
    assert!(!report.is_complete());

    // Items are gone on the service, but the local view is untouched.
    assert_eq!(svc.inner.snapshot().len(), 4);
    assert_eq!(explorer.view(), &before);
    assert_eq!(explorer.tree().len(), 7);
}

#[test]
fn upload_files_keeps_report_when_reload_fails() {
    let svc = recorded_sample();
    let mut explorer = Explorer::open(svc.clone(), claim()).unwrap();
    svc.break_listing();

    let report = explorer
        .upload_files(
            Some(&"A".into()),
            &[
                FileUpload::new("one.txt", Vec::new()),
                FileUpload::new("", Vec::new()),
            ],
        )
        .unwrap();
    assert_eq!(ids_of(&report.succeeded), vec!["one.txt"]);
    assert_eq!(report.failed.len(), 1);
    assert!(report.reload_error.is_some());
    assert_eq!(svc.inner.snapshot().len(), 8);
    assert_eq!(explorer.tree().len(), 7);
}

#[test]
fn upload_files_continues_past_failures() {
    let mut explorer = Explorer::open(InMemoryDocuments::new(), claim()).unwrap();
    let report = explorer
        .upload_files(
            None,
            &[
                FileUpload::new("ok.txt", Vec::new()),
                FileUpload::new("  ", Vec::new()),
                FileUpload::new("also-ok.pdf", Vec::new()),
            ],
        )
        .unwrap();
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(explorer.tree().len(), 2);
}

#[test]
fn previews_by_category() {
    let mut explorer = Explorer::open(InMemoryDocuments::new(), claim()).unwrap();
    let text = explorer
        .upload_file(None, &FileUpload::new("notes.txt", b"hello".to_vec()))
        .unwrap();
    let image = explorer
        .upload_file(None, &FileUpload::new("photo.PNG", vec![0x89, b'P', b'N', b'G']))
        .unwrap();
    let pdf = explorer
        .upload_file(None, &FileUpload::new("form.pdf", b"%PDF-1.7".to_vec()))
        .unwrap();

    assert_eq!(
        explorer.preview(&text.id).unwrap(),
        PreviewContent::Text("hello".to_string())
    );
    assert_eq!(
        explorer.preview(&image.id).unwrap(),
        PreviewContent::Image {
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    );
    assert_eq!(explorer.preview(&pdf.id).unwrap(), PreviewContent::Unavailable);
}

#[test]
fn breadcrumbs_survive_reload_after_rename() {
    let mut explorer =
        Explorer::open(InMemoryDocuments::with_nodes(sample_nodes()), claim()).unwrap();
    explorer.navigate_to_folder(Some(&"C".into()));
    explorer.rename(&"A".into(), "Supplier Invoices").unwrap();
    let names: Vec<_> = explorer
        .view()
        .breadcrumbs
        .iter()
        .map(|b| b.name.clone())
        .collect();
    assert_eq!(names, vec!["Root", "Supplier Invoices", "2024", "March"]);

    assert!(explorer.navigate_to_breadcrumb(Some(&"A".into())));
    assert_eq!(explorer.current_folder(), Some(NodeId::from("A")));
}

#[test]
fn missing_token_aborts_before_network() {
    let svc = HttpDocumentService::new("http://127.0.0.1:9", None).unwrap();
    let recorded = Recording::new(svc);
    let err = Explorer::open(recorded.clone(), claim()).err().unwrap();
    assert!(matches!(err, Error::AuthenticationMissing));
}
