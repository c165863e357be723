//! End-to-end runs of the orchestrator against a fake instance

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use gok::app::options::RunOptions;
use gok::app::run::Orchestrator;
use gok::errors::GokError;
use gok::storage::layout::InstanceLayout;
use tokio_util::sync::CancellationToken;

use crate::fake_instance::{FakeBuilder, FakeInstance, PASSWORD};

const BINARY_SIZE: usize = 256 * 1024;

struct Fixture {
    _scratch: tempfile::TempDir,
    build_dir: PathBuf,
    layout: InstanceLayout,
    instance: FakeInstance,
}

impl Fixture {
    async fn new() -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let build_dir = scratch.path().join("cmd").join("scan2drive");
        std::fs::create_dir_all(&build_dir).unwrap();

        let instance = FakeInstance::start().await;
        *instance.state.stdout_lines.lock().unwrap() = vec!["hello from scan2drive".to_string()];
        *instance.state.stderr_lines.lock().unwrap() = vec!["2024/01/01 starting".to_string()];
        let layout = instance.write_config(&scratch.path().join("gokrazy"), "scan2drive", PASSWORD);

        Self {
            _scratch: scratch,
            build_dir,
            layout,
            instance,
        }
    }

    fn options(&self) -> RunOptions {
        RunOptions::new(&self.build_dir, self.layout.clone())
    }

    /// Cancel `cancel` once the logs of the deployed service are flowing
    fn cancel_when_streaming(&self, cancel: &CancellationToken) {
        let canceller = cancel.clone();
        let state = self.instance.state.clone();
        let addr = self.instance.addr;
        tokio::spawn(async move {
            let instance = FakeInstance { addr, state };
            instance.wait_for_logs().await;
            canceller.cancel();
        });
    }
}

#[tokio::test]
async fn test_deploy_uploads_diverts_and_streams() {
    let fixture = Fixture::new().await;
    let builder = Arc::new(FakeBuilder::producing(vec![7u8; BINARY_SIZE]));
    let orchestrator = Orchestrator::new(builder.clone(), fixture.options());

    let cancel = CancellationToken::new();
    fixture.cancel_when_streaming(&cancel);

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    orchestrator
        .deploy(&cancel, &mut stdout, &mut stderr)
        .await
        .unwrap();

    let state = &fixture.instance.state;
    let staged = state.upload("gok-run/scan2drive").unwrap();
    assert_eq!(staged.len(), BINARY_SIZE);
    assert_eq!(state.uploads.lock().unwrap().len(), 1);
    assert_eq!(
        state.diversion("/user/scan2drive").as_deref(),
        Some("gok-run/scan2drive")
    );
    assert_eq!(state.restarts.load(Ordering::SeqCst), 1);

    let stdout = String::from_utf8(stdout).unwrap();
    assert!(
        stdout.contains("Transferred scan2drive (256.0 KiB) at "),
        "{}",
        stdout
    );
    let summary_end = stdout.find("(total: ").unwrap();
    let log_start = stdout.find("hello from scan2drive\n").unwrap();
    assert!(summary_end < log_start);

    // Progress output on stderr is finished and terminated before the first
    // relayed log line.
    let stderr = String::from_utf8(stderr).unwrap();
    let (progress, logs) = stderr.split_at(stderr.find("2024/01/01 starting").unwrap());
    assert_eq!(logs, "2024/01/01 starting\n");
    assert!(progress.is_empty() || progress.ends_with('\n'), "{:?}", progress);
    assert!(progress.lines().all(|l| l.starts_with('\r')), "{:?}", progress);
    assert!(!logs.contains('\r'));

    // The workspace is gone once the run is over.
    assert!(!builder.output_dir().exists());
}

#[tokio::test]
async fn test_build_without_binary_is_artifact_missing() {
    let fixture = Fixture::new().await;
    let builder = Arc::new(FakeBuilder::default());
    let orchestrator = Orchestrator::new(builder.clone(), fixture.options());

    let err = orchestrator
        .deploy(&CancellationToken::new(), &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GokError::ArtifactMissing { ref name } if name == "scan2drive"));
    assert!(err.to_string().contains("main-package directory"));
    assert!(fixture.instance.state.uploads.lock().unwrap().is_empty());
    assert!(!builder.output_dir().exists());
}

#[tokio::test]
async fn test_build_failure_is_distinct() {
    let fixture = Fixture::new().await;
    let builder = Arc::new(FakeBuilder {
        fail: true,
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(builder.clone(), fixture.options());

    let err = orchestrator
        .deploy(&CancellationToken::new(), &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GokError::Build(_)));
    assert_eq!(err.stage(), "build");
    assert!(!builder.output_dir().exists());
}

#[tokio::test]
async fn test_upload_failure_is_transfer_error() {
    let fixture = Fixture::new().await;
    fixture.instance.state.reject_upload.store(true, Ordering::SeqCst);
    let orchestrator = Orchestrator::new(
        FakeBuilder::producing(vec![1u8; 1024]),
        fixture.options(),
    );

    let err = orchestrator
        .deploy(&CancellationToken::new(), &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "upload");
    match err {
        GokError::Transfer { ref artifact, ref source } => {
            assert_eq!(artifact, "scan2drive");
            assert!(matches!(**source, GokError::HttpStatus { .. }), "{}", source);
        }
        other => panic!("unexpected error: {other}"),
    }
    let state = &fixture.instance.state;
    assert_eq!(state.divert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.logs_opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_diversion_opens_no_log_stream() {
    let fixture = Fixture::new().await;
    fixture.instance.state.reject_divert.store(true, Ordering::SeqCst);
    let orchestrator = Orchestrator::new(
        FakeBuilder::producing(vec![1u8; 1024]),
        fixture.options(),
    );

    let err = orchestrator
        .deploy(&CancellationToken::new(), &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap_err();

    match err {
        GokError::Diversion { ref path, .. } => assert_eq!(path, "/user/scan2drive"),
        other => panic!("unexpected error: {other}"),
    }
    let state = &fixture.instance.state;
    assert!(state.upload("gok-run/scan2drive").is_some());
    assert_eq!(state.logs_opened.load(Ordering::SeqCst), 0);
    assert_eq!(state.restarts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_before_divert_leaves_instance_untouched() {
    let fixture = Fixture::new().await;
    let cancel = CancellationToken::new();
    let builder = FakeBuilder {
        binary: Some(vec![1u8; 1024]),
        cancel_during_build: Some(cancel.clone()),
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(builder, fixture.options());

    let err = orchestrator
        .deploy(&cancel, &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GokError::Cancelled));
    let state = &fixture.instance.state;
    assert_eq!(state.divert_calls.load(Ordering::SeqCst), 0);
    assert!(state.diversions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_after_divert_keeps_diversion() {
    let fixture = Fixture::new().await;
    let orchestrator = Orchestrator::new(
        FakeBuilder::producing(vec![1u8; 1024]),
        fixture.options(),
    );
    let cancel = CancellationToken::new();
    fixture.cancel_when_streaming(&cancel);

    orchestrator
        .deploy(&cancel, &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap();

    let state = &fixture.instance.state;
    assert_eq!(state.divert_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        state.diversion("/user/scan2drive").as_deref(),
        Some("gok-run/scan2drive")
    );
}

#[tokio::test]
async fn test_dropped_log_connection_is_stream_failure() {
    let fixture = Fixture::new().await;
    fixture.instance.state.close_logs.store(true, Ordering::SeqCst);
    let orchestrator = Orchestrator::new(
        FakeBuilder::producing(vec![1u8; 1024]),
        fixture.options(),
    );

    let err = orchestrator
        .deploy(&CancellationToken::new(), &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GokError::Stream { .. }));
    // The diversion is not rolled back.
    assert!(fixture.instance.state.diversion("/user/scan2drive").is_some());
}

#[tokio::test]
async fn test_keep_retains_binary() {
    let scratch = tempfile::tempdir().unwrap();
    let instance = FakeInstance::start().await;
    let layout = instance.write_config(&scratch.path().join("gokrazy"), "scan2drive", PASSWORD);

    // A uniquely named build directory keeps the kept binary from clashing
    // with other runs sharing the system temp directory.
    let build_dir = tempfile::tempdir().unwrap();
    let name = build_dir
        .path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();

    let mut options = RunOptions::new(build_dir.path(), layout);
    options.keep = true;
    let builder = Arc::new(FakeBuilder::producing(vec![1u8; 1024]));
    let orchestrator = Orchestrator::new(builder.clone(), options);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    let state = instance.state.clone();
    let addr = instance.addr;
    tokio::spawn(async move {
        FakeInstance { addr, state }.wait_for_logs().await;
        canceller.cancel();
    });

    orchestrator
        .deploy(&cancel, &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap();

    assert_eq!(builder.output_dir(), std::env::temp_dir());
    let kept = std::env::temp_dir().join(&name);
    assert_eq!(std::fs::metadata(&kept).unwrap().len(), 1024);
    assert!(instance.state.upload(&format!("gok-run/{}", name)).is_some());
    std::fs::remove_file(kept).unwrap();
}

#[tokio::test]
async fn test_keep_never_deploys_a_stale_binary() {
    let scratch = tempfile::tempdir().unwrap();
    let instance = FakeInstance::start().await;
    let layout = instance.write_config(&scratch.path().join("gokrazy"), "scan2drive", PASSWORD);

    let build_dir = tempfile::tempdir().unwrap();
    let name = build_dir
        .path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();

    // Left behind by an earlier kept run.
    let stale = std::env::temp_dir().join(&name);
    std::fs::write(&stale, b"stale binary").unwrap();

    let mut options = RunOptions::new(build_dir.path(), layout);
    options.keep = true;
    // Builds successfully without producing a binary.
    let orchestrator = Orchestrator::new(FakeBuilder::default(), options);

    let err = orchestrator
        .deploy(&CancellationToken::new(), &mut Vec::new(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GokError::ArtifactMissing { name: ref n } if *n == name));
    assert!(!stale.exists());
    assert!(instance.state.uploads.lock().unwrap().is_empty());
    assert_eq!(instance.state.divert_calls.load(Ordering::SeqCst), 0);
}
