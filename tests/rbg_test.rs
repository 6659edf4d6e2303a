/*!
 * RBG Tests
 * Type 0 RBG sizing at the bandwidth thresholds
 */

use cv2x_mac_scheduler::rbg::{rbg_count, rbg_size, RbgAllocationMap, RbgState};
use cv2x_mac_scheduler::SchedulerError;
use pretty_assertions::assert_eq;

#[test]
fn test_rbg_size_boundaries() {
    let cases = [
        (9, 1),
        (10, 2),
        (25, 2),
        (26, 3),
        (62, 3),
        (63, 4),
        (109, 4),
    ];
    for (bandwidth, expected) in cases {
        assert_eq!(rbg_size(bandwidth), Ok(expected), "bandwidth {}", bandwidth);
    }
    assert_eq!(rbg_size(110), Err(SchedulerError::UnsupportedBandwidth(110)));
    assert_eq!(rbg_size(200), Err(SchedulerError::UnsupportedBandwidth(200)));
}

#[test]
fn test_rbg_count_rounds_up() {
    assert_eq!(rbg_count(6), Ok(6));
    assert_eq!(rbg_count(15), Ok(8));
    assert_eq!(rbg_count(25), Ok(13));
    assert_eq!(rbg_count(75), Ok(19));
    assert_eq!(rbg_count(100), Ok(25));
}

#[test]
fn test_entries_report_owners() {
    let mut map = RbgAllocationMap::new(3);
    map.mark_reserved(0);
    map.try_claim(2, 42);
    assert_eq!(
        map.entries(),
        &[RbgState::Reserved, RbgState::Free, RbgState::Claimed(42)]
    );
    assert_eq!(map.claimed_count(), 1);
}
