/*!
 * HARQ Tests
 * Process lifecycle, timeouts and transmission limits
 */

use cv2x_mac_scheduler::harq::{
    HarqConfig, HarqFailureReason, HarqProcess, HarqProcessTable, HarqStatus, NackOutcome,
};
use cv2x_mac_scheduler::{Direction, DlDci, RlcPdu};
use pretty_assertions::assert_eq;

fn dci(rnti: u16, harq_process: u8) -> DlDci {
    DlDci {
        rnti,
        rbg_bitmap: 0b111,
        harq_process,
        mcs: vec![12],
        tb_size: vec![320],
        ndi: vec![1],
        rv: vec![0],
        tpc: 1,
    }
}

fn table(max_transmissions: Option<u8>) -> HarqProcessTable<DlDci> {
    let mut table = HarqProcessTable::new(
        Direction::Downlink,
        HarqConfig {
            enabled: true,
            timeout: 11,
            max_transmissions,
        },
    );
    table.add_ue(7);
    table
}

#[test]
fn test_timeout_fires_exactly_once_at_threshold() {
    let mut table = table(None);
    let id = table.allocate_or_reuse_process(7).unwrap();
    table.mark_active(7, id, dci(7, id), vec![vec![RlcPdu { lcid: 3, size: 100 }]]);

    for _ in 0..10 {
        assert!(table.tick().is_empty());
    }
    assert_eq!(table.process(7, id).unwrap().timer, 10);

    let failures = table.tick();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].rnti, 7);
    assert_eq!(failures[0].process_id, id);
    assert_eq!(failures[0].reason, HarqFailureReason::Timeout);
    assert_eq!(failures[0].lost_bytes, 320);
    assert!(table.process(7, id).unwrap().is_free());

    assert!(table.tick().is_empty());
}

#[test]
fn test_ack_restores_pristine_free_state() {
    let mut table = table(None);
    let id = table.allocate_or_reuse_process(7).unwrap();
    let pristine: HarqProcess<DlDci> = table.process(7, id).unwrap().clone();

    table.mark_active(7, id, dci(7, id), vec![vec![RlcPdu { lcid: 3, size: 90 }]]);
    assert_eq!(
        table.process(7, id).unwrap().status,
        HarqStatus::Active { transmissions: 1 }
    );
    assert!(table.mark_acknowledged(7, id));

    assert_eq!(table.process(7, id).unwrap(), &pristine);
}

#[test]
fn test_nack_then_retransmission_counts_transmissions() {
    let mut table = table(Some(2));
    let id = table.allocate_or_reuse_process(7).unwrap();
    table.mark_active(7, id, dci(7, id), Vec::new());

    assert_eq!(table.mark_nack(7, id), NackOutcome::Retransmit);
    assert_eq!(table.pending_retransmissions(), vec![(7, id)]);
    assert!(table.mark_retransmitted(7, id, dci(7, id)));
    assert!(table.pending_retransmissions().is_empty());

    match table.mark_nack(7, id) {
        NackOutcome::Dropped(failure) => {
            assert_eq!(failure.reason, HarqFailureReason::MaxTransmissions);
            assert_eq!(failure.transmissions, 2);
        }
        other => panic!("expected drop, got {:?}", other),
    }
    assert!(table.process(7, id).unwrap().is_free());
    assert_eq!(table.mark_nack(7, id), NackOutcome::Stale);
}

#[test]
fn test_all_processes_busy() {
    let mut table = table(None);
    for _ in 0..8 {
        let id = table.allocate_or_reuse_process(7).unwrap();
        table.mark_active(7, id, dci(7, id), Vec::new());
    }
    assert_eq!(table.active_count(7), 8);
    assert!(!table.has_free_process(7));
    assert_eq!(table.allocate_or_reuse_process(7), None);
}

#[test]
fn test_disabled_harq_uses_process_zero_and_buffers_nothing() {
    let mut table: HarqProcessTable<DlDci> = HarqProcessTable::new(
        Direction::Downlink,
        HarqConfig {
            enabled: false,
            timeout: 11,
            max_transmissions: None,
        },
    );
    table.add_ue(3);
    for _ in 0..20 {
        let id = table.allocate_or_reuse_process(3).unwrap();
        assert_eq!(id, 0);
        table.mark_active(3, id, dci(3, id), Vec::new());
    }
    assert_eq!(table.active_count(3), 0);
    assert!(table.tick().is_empty());
}
