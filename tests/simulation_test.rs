/*!
 * Simulation Tests
 * Scenario runs through the full SAP with the seeded synthetic MAC
 */

use cv2x_mac_scheduler::sim::{AllocationTrace, TrafficModel, UeScenario};
use cv2x_mac_scheduler::{PolicyKind, Scenario, SchedulerConfig, Simulation};
use pretty_assertions::assert_eq;

fn ue(rnti: u16, dl_cqi: u8) -> UeScenario {
    UeScenario {
        rnti,
        transmission_mode: 0,
        logical_channels: Vec::new(),
        dl_cqi,
        cqi_jitter: 1,
        subband_cqi: true,
        cqi_period: 2,
        ul_sinr_db: 12.0,
        dl_traffic: TrafficModel::FullBuffer,
        ul_traffic: TrafficModel::Bursty {
            bytes: 400,
            probability: 0.3,
        },
    }
}

fn scenario(seed: u64) -> Scenario {
    Scenario {
        dl_bandwidth: 25,
        ul_bandwidth: 25,
        ttis: 60,
        seed,
        nack_probability: 0.25,
        harq_feedback_delay: 4,
        ues: vec![ue(1, 13), ue(2, 9), ue(3, 5)],
        rach: Vec::new(),
    }
}

fn run(config: SchedulerConfig, scenario: Scenario) -> AllocationTrace {
    Simulation::new(config, scenario).unwrap().run().unwrap()
}

#[test]
fn test_every_policy_is_deterministic() {
    for policy in PolicyKind::ALL {
        let config = SchedulerConfig::for_policy(policy);
        let a = run(config.clone(), scenario(42)).encode().unwrap();
        let b = run(config, scenario(42)).encode().unwrap();
        assert_eq!(a, b, "policy {}", policy);
    }
}

#[test]
fn test_trace_survives_encoding() {
    let trace = run(SchedulerConfig::default(), scenario(7));
    let decoded = AllocationTrace::decode(&trace.encode().unwrap()).unwrap();
    assert_eq!(decoded, trace);
}

#[test]
fn test_nacks_lead_to_retransmissions() {
    let mut sim = Simulation::new(SchedulerConfig::default(), scenario(11)).unwrap();
    let trace = sim.run().unwrap();
    let stats = sim.report(&trace).stats;
    assert!(stats.dl_new_grants > 0);
    assert!(stats.dl_retx_grants > 0);
    assert_eq!(stats.dl_ttis, 60);
    assert_eq!(stats.ul_ttis, 60);
}

#[test]
fn test_disabled_harq_never_retransmits() {
    let config = SchedulerConfig {
        harq_enabled: false,
        ..SchedulerConfig::default()
    };
    let trace = run(config, scenario(5));
    for record in &trace.records {
        assert!(record.dl.build_data_list.iter().all(|e| !e.retransmission));
        assert!(record.dl.build_data_list.iter().all(|e| e.dci.harq_process == 0));
        assert!(record.ul.dci_list.iter().all(|d| d.ndi == 1));
    }
}

#[test]
fn test_round_robin_shares_the_cell() {
    let mut sim = Simulation::new(SchedulerConfig::default(), scenario(3)).unwrap();
    let trace = sim.run().unwrap();
    let report = sim.report(&trace);
    assert_eq!(report.ues.len(), 3);
    assert!(report.ues.iter().all(|ue| ue.dl_bytes > 0));
    // Best channel gets the most bytes with equal RBG shares
    assert!(report.ues[0].dl_bytes > report.ues[2].dl_bytes);
}
