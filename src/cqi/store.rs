/*!
 * CQI Feedback Store
 * Latest wideband, subband and uplink CQI per UE, aged once per TTI
 *
 * A report is usable while its age is at most `cqi_timers_threshold` TTIs.
 * Newer reports replace older ones; nothing is ever appended.
 */

use crate::core::{Cqi, Direction, Rnti};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Aged<T> {
    value: T,
    age: u32,
}

impl<T> Aged<T> {
    fn fresh(value: T) -> Self {
        Self { value, age: 0 }
    }
}

#[derive(Debug, Clone, Default)]
struct UeCqi {
    /// One value per spatial layer
    wideband: Option<Aged<Vec<Cqi>>>,
    /// One value per RBG
    subband: Option<Aged<Vec<Cqi>>>,
    uplink: Option<Aged<Cqi>>,
}

/// Read-only view of the feedback held for one UE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CqiSnapshot {
    pub wideband: Option<Vec<Cqi>>,
    pub wideband_age: Option<u32>,
    pub subband: Option<Vec<Cqi>>,
    pub subband_age: Option<u32>,
    pub uplink: Option<Cqi>,
    pub uplink_age: Option<u32>,
}

/// Per-UE channel quality reports
#[derive(Debug, Clone)]
pub struct CqiFeedbackStore {
    threshold: u32,
    ues: BTreeMap<Rnti, UeCqi>,
}

impl CqiFeedbackStore {
    pub fn new(cqi_timers_threshold: u32) -> Self {
        Self {
            threshold: cqi_timers_threshold,
            ues: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Store a periodic wideband report (one CQI per layer)
    pub fn update_wideband(&mut self, rnti: Rnti, per_layer: Vec<Cqi>) {
        self.ues.entry(rnti).or_default().wideband = Some(Aged::fresh(per_layer));
    }

    /// Store a subband report (one CQI per RBG)
    pub fn update_subband(&mut self, rnti: Rnti, per_rbg: Vec<Cqi>) {
        self.ues.entry(rnti).or_default().subband = Some(Aged::fresh(per_rbg));
    }

    /// Store an uplink CQI derived from SRS or PUSCH SINR
    pub fn update_uplink(&mut self, rnti: Rnti, cqi: Cqi) {
        self.ues.entry(rnti).or_default().uplink = Some(Aged::fresh(cqi));
    }

    /// Age every report of one direction by a TTI
    pub fn tick(&mut self, direction: Direction) {
        for ue in self.ues.values_mut() {
            match direction {
                Direction::Downlink => {
                    if let Some(w) = ue.wideband.as_mut() {
                        w.age = w.age.saturating_add(1);
                    }
                    if let Some(s) = ue.subband.as_mut() {
                        s.age = s.age.saturating_add(1);
                    }
                }
                Direction::Uplink => {
                    if let Some(u) = ue.uplink.as_mut() {
                        u.age = u.age.saturating_add(1);
                    }
                }
            }
        }
    }

    #[inline]
    fn valid<'a, T>(&self, report: Option<&'a Aged<T>>) -> Option<&'a T> {
        let threshold = self.threshold;
        report.filter(|r| r.age <= threshold).map(|r| &r.value)
    }

    /// Non-stale wideband CQI per layer
    pub fn effective_wideband(&self, rnti: Rnti) -> Option<&[Cqi]> {
        let ue = self.ues.get(&rnti)?;
        self.valid(ue.wideband.as_ref()).map(|v| v.as_slice())
    }

    /// Non-stale subband CQI per RBG
    pub fn effective_subband(&self, rnti: Rnti) -> Option<&[Cqi]> {
        let ue = self.ues.get(&rnti)?;
        self.valid(ue.subband.as_ref()).map(|v| v.as_slice())
    }

    /// Non-stale DL CQI of the first layer
    ///
    /// Falls back to the mean of a valid subband report when no wideband
    /// report is usable.
    pub fn effective_cqi(&self, rnti: Rnti) -> Option<Cqi> {
        if let Some(&first) = self.effective_wideband(rnti).and_then(|w| w.first()) {
            return Some(first);
        }
        let subband = self.effective_subband(rnti)?;
        if subband.is_empty() {
            return None;
        }
        let sum: u32 = subband.iter().map(|&c| c as u32).sum();
        Some((sum / subband.len() as u32) as Cqi)
    }

    /// Non-stale uplink CQI
    pub fn effective_uplink(&self, rnti: Rnti) -> Option<Cqi> {
        let ue = self.ues.get(&rnti)?;
        self.valid(ue.uplink.as_ref()).copied()
    }

    pub fn remove_ue(&mut self, rnti: Rnti) -> bool {
        self.ues.remove(&rnti).is_some()
    }

    /// Everything held for a UE, stale reports included
    pub fn snapshot(&self, rnti: Rnti) -> Option<CqiSnapshot> {
        let ue = self.ues.get(&rnti)?;
        Some(CqiSnapshot {
            wideband: ue.wideband.as_ref().map(|w| w.value.clone()),
            wideband_age: ue.wideband.as_ref().map(|w| w.age),
            subband: ue.subband.as_ref().map(|s| s.value.clone()),
            subband_age: ue.subband.as_ref().map(|s| s.age),
            uplink: ue.uplink.as_ref().map(|u| u.value),
            uplink_age: ue.uplink.as_ref().map(|u| u.age),
        })
    }
}
