/*!
 * TTI Benchmarks
 *
 * Cost of one loaded DL+UL scheduling pass per policy and cell size
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cv2x_mac_scheduler::flow::LogicalChannelConfig;
use cv2x_mac_scheduler::sap::*;
use cv2x_mac_scheduler::{MacScheduler, PolicyKind, SchedulerConfig, SfnSf};

fn loaded_scheduler(policy: PolicyKind, bandwidth: u16, ues: u16) -> MacScheduler {
    let mut sched = MacScheduler::new(SchedulerConfig::for_policy(policy)).unwrap();
    sched
        .configure_cell(&CschedCellConfigReq {
            dl_bandwidth: bandwidth,
            ul_bandwidth: bandwidth,
            num_ccs: 1,
        })
        .unwrap();
    for rnti in 1..=ues {
        sched
            .configure_ue(&CschedUeConfigReq {
                rnti,
                reconfigure: false,
                transmission_mode: (rnti % 3) as u8,
            })
            .unwrap();
        sched
            .configure_lcs(&CschedLcConfigReq {
                rnti,
                reconfigure: false,
                logical_channels: vec![LogicalChannelConfig::best_effort(3)],
            })
            .unwrap();
    }
    sched
}

/// Refresh queues and feedback so every TTI sees the same load
fn refill(sched: &mut MacScheduler, ues: u16, rbgs: usize) {
    for rnti in 1..=ues {
        sched.update_rlc_buffer(&SchedDlRlcBufferReq {
            rnti,
            lcid: 3,
            tx_queue_size: 50_000,
            tx_queue_hol_delay: 0,
            retx_queue_size: 0,
            retx_queue_hol_delay: 0,
            status_pdu_size: 0,
        });
        let cqi = (rnti % 15 + 1) as u8;
        sched.update_dl_cqi(&SchedDlCqiInfoReq {
            sfn_sf: SfnSf::default(),
            cqi_list: vec![DlCqiReport {
                rnti,
                wideband: Some(vec![cqi, cqi]),
                subband: Some((0..rbgs).map(|i| ((i + rnti as usize) % 15 + 1) as u8).collect()),
            }],
        });
        sched.update_ul_cqi(&SchedUlCqiInfoReq {
            sfn_sf: SfnSf::default(),
            source: UlCqiSource::Srs { rnti },
            sinr_db: vec![cqi as f64],
        });
        sched.update_ul_mac_ctrl(&SchedUlMacCtrlInfoReq {
            sfn_sf: SfnSf::default(),
            mac_ce_list: vec![MacCeBsr {
                rnti,
                buffer_status: vec![0, 0, 0, 40],
            }],
        });
    }
}

/// ACK every grant so HARQ processes never run out
fn acks(ind: &DlConfigInd) -> Vec<DlInfo> {
    ind.build_data_list
        .iter()
        .map(|e| DlInfo {
            rnti: e.rnti,
            harq_process_id: e.dci.harq_process,
            status: vec![HarqFeedback::Ack; e.dci.layers()],
        })
        .collect()
}

fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("tti_per_policy");
    let ues = 20;

    for policy in PolicyKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(policy), &policy, |b, &policy| {
            let mut sched = loaded_scheduler(policy, 50, ues);
            let rbgs = sched.cell().map(|c| c.rbg_count).unwrap_or(0);
            let mut sfn_sf = SfnSf::default();
            let mut dl_info = Vec::new();
            b.iter(|| {
                refill(&mut sched, ues, rbgs);
                let dl = sched
                    .schedule_dl(&SchedDlTriggerReq {
                        sfn_sf,
                        dl_info: std::mem::take(&mut dl_info),
                    })
                    .unwrap();
                let ul = sched
                    .schedule_ul(&SchedUlTriggerReq {
                        sfn_sf,
                        ul_info: Vec::new(),
                    })
                    .unwrap();
                dl_info = acks(&dl);
                sfn_sf = sfn_sf.next();
                black_box((dl, ul))
            });
        });
    }

    group.finish();
}

fn bench_bandwidths(c: &mut Criterion) {
    let mut group = c.benchmark_group("dl_tti_per_bandwidth");

    for bandwidth in [6u16, 25, 50, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(bandwidth),
            &bandwidth,
            |b, &bandwidth| {
                let mut sched = loaded_scheduler(PolicyKind::ProportionalFair, bandwidth, 10);
                let rbgs = sched.cell().map(|c| c.rbg_count).unwrap_or(0);
                let mut sfn_sf = SfnSf::default();
                let mut dl_info = Vec::new();
                b.iter(|| {
                    refill(&mut sched, 10, rbgs);
                    let ind = sched
                        .schedule_dl(&SchedDlTriggerReq {
                            sfn_sf,
                            dl_info: std::mem::take(&mut dl_info),
                        })
                        .unwrap();
                    dl_info = acks(&ind);
                    sfn_sf = sfn_sf.next();
                    black_box(ind)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_policies, bench_bandwidths);
criterion_main!(benches);
