//! Event filter admission tests: debounce, temp exclusion, directory
//! backfill, and the move asymmetry.

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, time::Duration};

  use pretty_assertions::assert_eq;

  use crate::actor::{
    __tests__::helpers::{drain, fast_filter_config, filter_fixture},
    message::ChangeEvent,
  };

  #[tokio::test]
  async fn test_debounce_admits_once_per_window() {
    let (mut filter, mut rx) = filter_fixture(fast_filter_config());

    filter.admit(ChangeEvent::created("/in/upload.bin"));
    filter.admit(ChangeEvent::modified("/in/upload.bin"));
    filter.admit(ChangeEvent::modified("/in/upload.bin"));

    let records = drain(&mut rx);
    assert_eq!(records.len(), 1, "rapid repeats must collapse to one admission");
    assert_eq!(records[0].retry_count, 0);

    // Once the ignore window has elapsed, the same path is admitted again
    tokio::time::sleep(Duration::from_millis(60)).await;
    filter.admit(ChangeEvent::modified("/in/upload.bin"));
    assert_eq!(drain(&mut rx).len(), 1);
  }

  #[tokio::test]
  async fn test_rejection_does_not_extend_the_window() {
    let (mut filter, mut rx) = filter_fixture(fast_filter_config());

    filter.admit(ChangeEvent::created("/in/upload.bin"));
    tokio::time::sleep(Duration::from_millis(30)).await;
    // Rejected, and must not push the window out to 80ms
    filter.admit(ChangeEvent::modified("/in/upload.bin"));
    tokio::time::sleep(Duration::from_millis(30)).await;
    // 60ms after the accepted create: admitted
    filter.admit(ChangeEvent::modified("/in/upload.bin"));

    assert_eq!(drain(&mut rx).len(), 2);
  }

  #[tokio::test]
  async fn test_paths_are_debounced_independently() {
    let (mut filter, mut rx) = filter_fixture(fast_filter_config());

    filter.admit(ChangeEvent::created("/in/a.bin"));
    filter.admit(ChangeEvent::created("/in/b.bin"));
    filter.admit(ChangeEvent::modified("/in/a.bin"));

    let paths: Vec<_> = drain(&mut rx).into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec![PathBuf::from("/in/a.bin"), PathBuf::from("/in/b.bin")]);
  }

  #[tokio::test]
  async fn test_temp_files_excluded_from_create_handling() {
    let (mut filter, mut rx) = filter_fixture(fast_filter_config());

    filter.admit(ChangeEvent::created("/in/.goutputstream-X4F2"));
    assert!(drain(&mut rx).is_empty(), "temp create must not be staged");

    // The exclusion applies to creates only; a modification of the same
    // name still goes through.
    filter.admit(ChangeEvent::modified("/in/.goutputstream-X4F2"));
    assert_eq!(drain(&mut rx).len(), 1);
  }

  #[tokio::test]
  async fn test_moves_bypass_debounce_but_stamp_the_ledger() {
    let (mut filter, mut rx) = filter_fixture(fast_filter_config());

    filter.admit(ChangeEvent::created("/in/part.tmp"));
    // Admitted unconditionally, right after the create
    filter.admit(ChangeEvent::moved("/in/part.tmp", "/in/final.bin"));

    let paths: Vec<_> = drain(&mut rx).into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec![PathBuf::from("/in/part.tmp"), PathBuf::from("/in/final.bin")]);

    // The move stamped the destination, so a trailing modify is debounced
    filter.admit(ChangeEvent::modified("/in/final.bin"));
    assert!(drain(&mut rx).is_empty());
  }

  #[tokio::test]
  async fn test_deletes_are_informational() {
    let (mut filter, mut rx) = filter_fixture(fast_filter_config());

    filter.admit(ChangeEvent::deleted("/in/gone.bin"));
    assert!(drain(&mut rx).is_empty());

    // A delete must not open a debounce window either
    filter.admit(ChangeEvent::created("/in/gone.bin"));
    assert_eq!(drain(&mut rx).len(), 1);
  }

  #[tokio::test]
  async fn test_directory_backfill_admits_each_contained_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    std::fs::create_dir(root.join("sub")).expect("mkdir");
    std::fs::write(root.join("a.bin"), b"aaa").expect("write");
    std::fs::write(root.join("b.bin"), b"bbb").expect("write");
    std::fs::write(root.join("sub/c.bin"), b"ccc").expect("write");
    std::fs::write(root.join(".goutputstream-TMP"), b"tmp").expect("write");

    let (mut filter, mut rx) = filter_fixture(fast_filter_config());
    filter.admit(ChangeEvent::created_dir(root));

    let mut paths: Vec<_> = drain(&mut rx).into_iter().map(|r| r.path).collect();
    paths.sort();
    assert_eq!(paths, vec![
      root.join("a.bin"),
      root.join("b.bin"),
      root.join("sub/c.bin")
    ]);
  }

  #[tokio::test]
  async fn test_backfill_skips_already_seen_files_but_keeps_walking() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    std::fs::write(root.join("a.bin"), b"aaa").expect("write");
    std::fs::write(root.join("b.bin"), b"bbb").expect("write");

    let (mut filter, mut rx) = filter_fixture(fast_filter_config());

    // a.bin was just admitted through a normal create...
    filter.admit(ChangeEvent::created(root.join("a.bin")));
    drain(&mut rx);

    // ...so the backfill debounces it but still admits the rest
    filter.admit(ChangeEvent::created_dir(root));
    let paths: Vec<_> = drain(&mut rx).into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec![root.join("b.bin")]);
  }
}
