// Conformance scenarios run end to end against the in-memory backend.

mod common;

use common::{assert_report_passed, init_logger, specs_dir};
use gridfs_tck::config::TckConfig;
use gridfs_tck::fixtures::{
    run_spec, run_spec_dir, run_spec_file, GridFsBackend, InMemoryBackend, Spec, TestStatus,
};
use gridfs_tck::TckError;

async fn run_bundled(name: &str, legacy: bool) {
    run_with_config(
        name,
        TckConfig {
            legacy_server: legacy,
            ..TckConfig::default()
        },
    )
    .await;
}

async fn run_with_config(name: &str, config: TckConfig) {
    init_logger();
    let mut backend = InMemoryBackend::from_config(&config);
    let report = run_spec_file(&specs_dir().join(name), &mut backend)
        .await
        .unwrap();

    assert!(report.total > 0);
    assert_report_passed(&report);
}

#[tokio::test]
async fn test_upload_spec() {
    run_bundled("upload.yml", false).await;
}

#[tokio::test]
async fn test_download_spec() {
    run_bundled("download.yml", false).await;
}

#[tokio::test]
async fn test_delete_spec() {
    run_bundled("delete.yml", false).await;
}

#[tokio::test]
async fn test_specs_on_legacy_server() {
    for name in ["upload.yml", "download.yml", "delete.yml"] {
        run_bundled(name, true).await;
    }
}

#[tokio::test]
async fn test_specs_on_custom_bucket() {
    for name in ["upload.yml", "download.yml", "delete.yml"] {
        let config = TckConfig {
            bucket_name: "photos".to_string(),
            ..TckConfig::default()
        };
        run_with_config(name, config).await;
    }
}

#[tokio::test]
async fn test_spec_dir_shares_one_backend() {
    init_logger();
    let mut backend = InMemoryBackend::default();
    let reports = run_spec_dir(&specs_dir(), &mut backend).await.unwrap();

    let names: Vec<&str> = reports.iter().map(|r| r.spec.as_str()).collect();
    assert_eq!(names, vec!["delete.yml", "download.yml", "upload.yml"]);
    for report in &reports {
        assert_report_passed(report);
    }
    assert_eq!(backend.files_collection().count(), 0);
    assert_eq!(backend.chunks_collection().count(), 0);
}

#[tokio::test]
async fn test_upload_hello_references_its_own_id() {
    init_logger();
    let spec = Spec::parse(
        "hello.yml",
        r#"
data: { files: [], chunks: [] }
tests:
  - description: "Upload hello"
    act:
      operation: upload
      arguments: { filename: "hello.txt", source: { "$hex": "68656c6c6f" } }
    assert:
      result: "&result"
"#,
    )
    .unwrap();

    let mut cases = spec.tests().unwrap();
    let case = &mut cases[0];
    let mut backend = InMemoryBackend::default();
    case.run(&mut backend).await.unwrap();
    case.verify(&backend).unwrap();

    let id = *case.result().unwrap().as_object_id().unwrap();
    let files = backend.files_collection().snapshot();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["_id"].as_object_id(), Some(&id));
    assert!(backend.chunks_collection().count() >= 1);
    assert_eq!(backend.download(&id).await.unwrap(), b"hello".to_vec());
}

#[tokio::test]
async fn test_literal_result_mismatch_fails() {
    init_logger();
    let spec = Spec::parse(
        "pinned.yml",
        r#"
tests:
  - description: "Upload compared to a literal id"
    act:
      operation: upload
      arguments: { filename: "a", source: { "$hex": "11" } }
    assert:
      result: "5a1b2c3d4e5f60718293a4b5"
"#,
    )
    .unwrap();

    let mut backend = InMemoryBackend::default();
    let report = run_spec(&spec, &mut backend).await.unwrap();
    assert_eq!(report.results[0].status, TestStatus::Fail);
}

#[tokio::test]
async fn test_chunk_identifiers_are_not_compared() {
    init_logger();
    let spec = Spec::parse(
        "identifiers.yml",
        r#"
data:
  files:
    - { _id: { "$oid": "000000000000000000000001" }, length: 1, chunkSize: 4, uploadDate: "*actual", filename: "a" }
  chunks:
    - { _id: { "$oid": "000000000000000000000101" }, files_id: { "$oid": "000000000000000000000001" }, n: 0, data: { "$hex": "11" } }
tests:
  - description: "Chunk re-inserted under a new identifier"
    arrange:
      data:
        - { delete: "fs.chunks", deletes: [ { q: { files_id: { "$oid": "000000000000000000000001" } }, limit: 0 } ] }
        - { insert: "fs.chunks", documents: [ { _id: { "$oid": "000000000000000000000999" }, files_id: { "$oid": "000000000000000000000001" }, n: 0, data: { "$hex": "11" } } ] }
    act:
      operation: download
      arguments: { id: { "$oid": "000000000000000000000001" } }
    assert:
      result: { "$hex": "11" }
      data: []
"#,
    )
    .unwrap();

    let mut backend = InMemoryBackend::default();
    let report = run_spec(&spec, &mut backend).await.unwrap();
    assert_report_passed(&report);
}

#[tokio::test]
async fn test_unknown_error_kind_aborts_spec() {
    init_logger();
    let err = Spec::parse(
        "bad.yml",
        r#"
tests:
  - description: "Unknown kind"
    act: { operation: delete, arguments: { id: { "$oid": "000000000000000000000000" } } }
    assert: { error: "ChunkIsHaunted" }
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TckError::UnknownErrorKind(kind) if kind == "ChunkIsHaunted"));
}
