use std::collections::HashSet;

use ibtrack::bitmap_iter::BitmapIterator;
use ibtrack::controller::Controller;
use ibtrack::reflog::DemoLogSource;
use tempfile::tempdir;

#[test]
fn tracks_and_iterates_changed_pages_across_rotation() {
    let dir = tempdir().unwrap();
    let mut source = DemoLogSource::new(12, 64 * 1024 * 1024);

    let mut controller =
        Controller::init(dir.path().to_path_buf(), &mut source, 4096, 16384).unwrap();

    source.append_mtr(&[(1, 0), (1, 5), (2, 10)]);
    controller.follow(&mut source).unwrap();
    let after_first = controller.tracked_lsn();

    source.append_mtr(&[(1, 100), (3, 0)]);
    controller.follow(&mut source).unwrap();
    let after_second = controller.tracked_lsn();
    assert!(after_second > after_first);

    controller.shutdown();

    let mut seen: HashSet<(u32, u32)> = HashSet::new();
    let mut iter = BitmapIterator::init(dir.path(), 0, after_second).unwrap();
    while iter.next().unwrap() {
        if iter.changed() {
            seen.insert((iter.space_id(), iter.page_id()));
        }
    }

    assert!(seen.contains(&(1, 0)));
    assert!(seen.contains(&(1, 5)));
    assert!(seen.contains(&(2, 10)));
    assert!(seen.contains(&(1, 100)));
    assert!(seen.contains(&(3, 0)));
}

#[test]
fn reopening_after_shutdown_preserves_tracked_lsn() {
    let dir = tempdir().unwrap();
    let mut source = DemoLogSource::new(12, 64 * 1024 * 1024);
    source.append_mtr(&[(9, 1)]);

    let tracked = {
        let mut controller =
            Controller::init(dir.path().to_path_buf(), &mut source, 1 << 20, 16384).unwrap();
        controller.follow(&mut source).unwrap();
        let tracked = controller.tracked_lsn();
        controller.shutdown();
        tracked
    };

    let controller2 =
        Controller::init(dir.path().to_path_buf(), &mut source, 1 << 20, 16384).unwrap();
    assert_eq!(controller2.tracked_lsn(), tracked);
}
