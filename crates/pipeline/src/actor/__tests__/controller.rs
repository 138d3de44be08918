//! End-to-end pipeline tests: live watch events, injection, pause/resume,
//! and shutdown diagnostics.

#[cfg(test)]
mod tests {
  use std::time::{Duration, Instant};

  use tokio::time::timeout;

  use crate::actor::{
    __tests__::helpers::fast_filter_config,
    controller::{Pipeline, PipelineOptions},
    message::{AdmissionRecord, QueueDump},
  };

  fn fast_options(root: &std::path::Path) -> PipelineOptions {
    PipelineOptions {
      root: root.to_path_buf(),
      filter: fast_filter_config(),
      completion: intake_core::CompletionConfig {
        poll_interval_ms: 20,
        check_timeout_ms: 500,
        max_retries: 3,
        workers: 2,
      },
    }
  }

  #[tokio::test]
  async fn test_written_file_comes_out_ready() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().canonicalize().expect("canonicalize");

    let pipeline = Pipeline::start(fast_options(&root)).expect("start pipeline");
    let ready = pipeline.ready();

    // Give the watch a moment to establish
    tokio::time::sleep(Duration::from_millis(100)).await;

    let path = root.join("upload.bin");
    std::fs::write(&path, vec![0u8; 1024]).expect("write");

    let got = timeout(Duration::from_secs(3), ready.recv())
      .await
      .expect("timeout waiting for ready file")
      .expect("ready queue open");
    assert_eq!(got, path);

    let dump = pipeline.stop().await;
    assert!(dump.staging.is_empty(), "nothing should be left mid-flight: {dump:?}");
  }

  #[tokio::test]
  async fn test_inject_paths_bypasses_debounce() {
    let watch_dir = tempfile::tempdir().expect("tempdir");
    let data_dir = tempfile::tempdir().expect("tempdir");
    let path = data_dir.path().join("synced.bin");
    std::fs::write(&path, vec![0u8; 128]).expect("write");

    let pipeline = Pipeline::start(fast_options(watch_dir.path())).expect("start pipeline");
    let ready = pipeline.ready();

    // The same path twice, back to back: a debounced source would collapse
    // them, injection must not
    pipeline.inject_paths(vec![path.clone(), path.clone()]);

    for _ in 0..2 {
      let got = timeout(Duration::from_secs(2), ready.recv())
        .await
        .expect("timeout waiting for injected path")
        .expect("ready queue open");
      assert_eq!(got, path);
    }

    pipeline.stop().await;
  }

  #[tokio::test]
  async fn test_stop_reports_remaining_work_promptly() {
    let watch_dir = tempfile::tempdir().expect("tempdir");
    let data_dir = tempfile::tempdir().expect("tempdir");

    let mut paths = Vec::new();
    for i in 0..5 {
      let path = data_dir.path().join(format!("pending-{i}.bin"));
      std::fs::write(&path, vec![0u8; 64]).expect("write");
      paths.push(path);
    }

    // One slow worker: each check needs a 200ms sub-poll, so nothing
    // finishes before we pull the plug
    let options = PipelineOptions {
      root: watch_dir.path().to_path_buf(),
      filter: fast_filter_config(),
      completion: intake_core::CompletionConfig {
        poll_interval_ms: 200,
        check_timeout_ms: 2000,
        max_retries: 3,
        workers: 1,
      },
    };
    let pipeline = Pipeline::start(options).expect("start pipeline");
    pipeline.inject_paths(paths.clone());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stop_started = Instant::now();
    let dump = pipeline.stop().await;

    // Bounded by one poll interval, not by the per-check timeout
    assert!(stop_started.elapsed() < Duration::from_secs(1));

    // Every injected path is accounted for, including the one the worker
    // had in its hands when the shutdown hit
    assert_eq!(dump.staging.len() + dump.ready.len(), paths.len(), "{dump:?}");
    assert!(dump.staging.len() >= 4, "{dump:?}");
  }

  #[tokio::test]
  async fn test_pause_detaches_and_resume_reattaches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().canonicalize().expect("canonicalize");

    let mut pipeline = Pipeline::start(fast_options(&root)).expect("start pipeline");
    let ready = pipeline.ready();
    tokio::time::sleep(Duration::from_millis(100)).await;

    pipeline.pause().expect("pause");

    // Written while detached: never enters the pipeline
    std::fs::write(root.join("missed.bin"), vec![0u8; 64]).expect("write");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(ready.try_recv().await.is_none(), "paused pipeline must not emit");

    pipeline.resume().expect("resume");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let path = root.join("caught.bin");
    std::fs::write(&path, vec![0u8; 64]).expect("write");

    let got = timeout(Duration::from_secs(3), ready.recv())
      .await
      .expect("timeout waiting for post-resume file")
      .expect("ready queue open");
    assert_eq!(got, path);

    pipeline.stop().await;
  }

  #[test]
  fn test_queue_dump_serializes_for_diagnostics() {
    let dump = QueueDump {
      staging: vec![AdmissionRecord {
        path: "/in/half.bin".into(),
        retry_count: 2,
      }],
      ready: vec!["/in/done.bin".into()],
    };

    let value = serde_json::to_value(&dump).expect("serialize dump");
    assert_eq!(value["staging"][0]["path"], "/in/half.bin");
    assert_eq!(value["staging"][0]["retry_count"], 2);
    assert_eq!(value["ready"][0], "/in/done.bin");
    assert!(!dump.is_empty());
  }
}
