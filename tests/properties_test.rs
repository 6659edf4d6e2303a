/*!
 * Property Tests
 * Determinism, resource exclusivity and retransmission precedence under random load
 */

use cv2x_mac_scheduler::core::Cqi;
use cv2x_mac_scheduler::flow::LogicalChannelConfig;
use cv2x_mac_scheduler::sap::*;
use cv2x_mac_scheduler::{MacScheduler, PolicyKind, SchedulerConfig, SfnSf};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct UeLoad {
    cqi: Cqi,
    dl_bytes: u32,
    bsr_level: u8,
    two_layers: bool,
}

fn ue_load() -> impl Strategy<Value = UeLoad> {
    (1u8..=15, 0u32..20_000, 0u8..40, any::<bool>()).prop_map(
        |(cqi, dl_bytes, bsr_level, two_layers)| UeLoad {
            cqi,
            dl_bytes,
            bsr_level,
            two_layers,
        },
    )
}

/// Drive `ttis` DL+UL triggers, NACKing grants according to `nacks` (cycled)
fn run(
    policy: PolicyKind,
    bandwidth: u16,
    ues: &[UeLoad],
    nacks: &[bool],
    ttis: u32,
) -> Vec<(DlConfigInd, UlConfigInd)> {
    let mut sched = MacScheduler::new(SchedulerConfig::for_policy(policy)).unwrap();
    sched
        .configure_cell(&CschedCellConfigReq {
            dl_bandwidth: bandwidth,
            ul_bandwidth: bandwidth,
            num_ccs: 1,
        })
        .unwrap();

    for (i, ue) in ues.iter().enumerate() {
        let rnti = i as u16 + 1;
        sched
            .configure_ue(&CschedUeConfigReq {
                rnti,
                reconfigure: false,
                transmission_mode: if ue.two_layers { 2 } else { 0 },
            })
            .unwrap();
        sched
            .configure_lcs(&CschedLcConfigReq {
                rnti,
                reconfigure: false,
                logical_channels: vec![LogicalChannelConfig::best_effort(3)],
            })
            .unwrap();
        sched.update_rlc_buffer(&SchedDlRlcBufferReq {
            rnti,
            lcid: 3,
            tx_queue_size: ue.dl_bytes,
            tx_queue_hol_delay: 0,
            retx_queue_size: 0,
            retx_queue_hol_delay: 0,
            status_pdu_size: 0,
        });
        let layers = if ue.two_layers { 2 } else { 1 };
        sched.update_dl_cqi(&SchedDlCqiInfoReq {
            sfn_sf: SfnSf::default(),
            cqi_list: vec![DlCqiReport {
                rnti,
                wideband: Some(vec![ue.cqi; layers]),
                subband: Some((0..32).map(|k| ((ue.cqi as usize + k) % 15 + 1) as Cqi).collect()),
            }],
        });
        sched.update_ul_cqi(&SchedUlCqiInfoReq {
            sfn_sf: SfnSf::default(),
            source: UlCqiSource::Srs { rnti },
            sinr_db: vec![ue.cqi as f64],
        });
        sched.update_ul_mac_ctrl(&SchedUlMacCtrlInfoReq {
            sfn_sf: SfnSf::default(),
            mac_ce_list: vec![MacCeBsr {
                rnti,
                buffer_status: vec![0, 0, ue.bsr_level, 0],
            }],
        });
    }

    let mut out = Vec::new();
    let mut nack_iter = nacks.iter().cycle();
    let mut dl_info = Vec::new();
    let mut ul_info = Vec::new();
    for tti in 0..ttis {
        let sfn_sf = SfnSf::default().advance(tti);
        let dl = sched
            .schedule_dl(&SchedDlTriggerReq {
                sfn_sf,
                dl_info: std::mem::take(&mut dl_info),
            })
            .unwrap();
        let ul = sched
            .schedule_ul(&SchedUlTriggerReq {
                sfn_sf,
                ul_info: std::mem::take(&mut ul_info),
            })
            .unwrap();

        for element in &dl.build_data_list {
            let nack = *nack_iter.next().unwrap_or(&false);
            let status = if nack { HarqFeedback::Nack } else { HarqFeedback::Ack };
            dl_info.push(DlInfo {
                rnti: element.rnti,
                harq_process_id: element.dci.harq_process,
                status: vec![status; element.dci.layers()],
            });
        }
        for dci in &ul.dci_list {
            let nack = *nack_iter.next().unwrap_or(&false);
            ul_info.push(UlInfo {
                rnti: dci.rnti,
                harq_process_id: dci.harq_process,
                status: if nack { HarqFeedback::Nack } else { HarqFeedback::Ack },
            });
        }
        out.push((dl, ul));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_claimed_resources_are_disjoint(
        ues in prop::collection::vec(ue_load(), 1..7),
        policy in 0usize..PolicyKind::ALL.len(),
        bandwidth in prop::sample::select(vec![6u16, 15, 25, 50, 100]),
        nacks in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let rbgs = (bandwidth as usize).div_ceil(match bandwidth {
            0..=9 => 1,
            10..=25 => 2,
            26..=62 => 3,
            _ => 4,
        });
        for (dl, ul) in run(PolicyKind::ALL[policy], bandwidth, &ues, &nacks, 12) {
            let mut union = 0u32;
            for element in &dl.build_data_list {
                prop_assert_eq!(union & element.dci.rbg_bitmap, 0);
                union |= element.dci.rbg_bitmap;
            }
            prop_assert!(union.count_ones() as usize <= rbgs);

            let mut taken = vec![false; bandwidth as usize];
            for dci in &ul.dci_list {
                let start = dci.rb_start as usize;
                let end = start + dci.rb_len as usize;
                prop_assert!(end <= bandwidth as usize);
                for rb in start..end {
                    prop_assert!(!taken[rb]);
                    taken[rb] = true;
                }
            }
        }
    }

    #[test]
    fn prop_retransmissions_precede_new_data(
        ues in prop::collection::vec(ue_load(), 1..7),
        policy in 0usize..PolicyKind::ALL.len(),
        nacks in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        for (dl, _) in run(PolicyKind::ALL[policy], 25, &ues, &nacks, 12) {
            let first_new = dl
                .build_data_list
                .iter()
                .position(|e| !e.retransmission)
                .unwrap_or(dl.build_data_list.len());
            prop_assert!(dl.build_data_list[first_new..].iter().all(|e| !e.retransmission));

            let mut rntis: Vec<u16> = dl.build_data_list.iter().map(|e| e.rnti).collect();
            let before = rntis.len();
            rntis.sort_unstable();
            rntis.dedup();
            prop_assert_eq!(rntis.len(), before);
        }
    }

    #[test]
    fn prop_identical_inputs_give_identical_bytes(
        ues in prop::collection::vec(ue_load(), 1..5),
        policy in 0usize..PolicyKind::ALL.len(),
        nacks in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let a = run(PolicyKind::ALL[policy], 50, &ues, &nacks, 10);
        let b = run(PolicyKind::ALL[policy], 50, &ues, &nacks, 10);
        prop_assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
    }
}
