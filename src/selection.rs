use serde::{Deserialize, Serialize};

use crate::data::{Dataset, Photon};

/// The edges of the barrel/endcap transition region excluded from the
/// pseudorapidity acceptance.
pub const CRACK_ETA_MIN: f64 = 1.37;
pub const CRACK_ETA_MAX: f64 = 1.52;

/// The threshold configuration for one selection pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cuts {
    /// Minimum photon transverse momentum [GeV].
    pub pt_min: f64,
    /// Maximum photon |pseudorapidity|.
    pub eta_max: f64,
    /// Maximum isolation-cone energy as a fraction of the photon pt.
    pub isolation_max: f64,
}

impl Cuts {
    /// Identification, momentum, and acceptance requirements for a single
    /// photon, before isolation.
    fn passes_quality(&self, photon: &Photon) -> bool {
        let abs_eta = photon.eta.abs();
        photon.is_tight_id
            && photon.pt > self.pt_min
            && abs_eta < self.eta_max
            && !(CRACK_ETA_MIN..=CRACK_ETA_MAX).contains(&abs_eta)
    }

    fn passes_isolation(&self, photon: &Photon) -> bool {
        photon.ptcone30 / photon.pt < self.isolation_max
            && photon.etcone20 / photon.pt < self.isolation_max
    }
}

/// Reduce a dataset to its selected photon pairs.
///
/// An event survives iff its trigger flag is set, it contains exactly two
/// photons, and both pass the quality and isolation cuts. Events with any
/// other photon count are dropped whole, never truncated or padded, so
/// tightening `pt_min` can only shrink the selection. The output preserves
/// event order, and each pair keeps file order (leading = first stored
/// photon).
pub fn select_pairs(dataset: &Dataset, cuts: &Cuts) -> Vec<[Photon; 2]> {
    dataset
        .iter()
        .filter(|event| event.trigger)
        .filter_map(|event| {
            match event.photons.as_slice() {
                [first, second]
                    if cuts.passes_quality(first)
                        && cuts.passes_quality(second)
                        && cuts.passes_isolation(first)
                        && cuts.passes_isolation(second) =>
                {
                    Some([*first, *second])
                }
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EventData;

    fn good_photon(pt: f64) -> Photon {
        Photon {
            pt,
            eta: 0.4,
            phi: 0.0,
            e: pt * 1.1,
            is_tight_id: true,
            ptcone30: pt * 0.01,
            etcone20: pt * 0.01,
        }
    }

    fn pair_event(pt: f64) -> EventData {
        EventData {
            photons: vec![good_photon(pt), good_photon(pt * 0.8)],
            trigger: true,
        }
    }

    fn cuts() -> Cuts {
        Cuts {
            pt_min: 10.0,
            eta_max: 2.37,
            isolation_max: 0.065,
        }
    }

    #[test]
    fn test_selects_clean_pair() {
        let dataset = Dataset::new(vec![pair_event(50.0)]);
        let pairs = select_pairs(&dataset, &cuts());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0][0].pt, 50.0);
        assert_eq!(pairs[0][1].pt, 40.0);
    }

    #[test]
    fn test_trigger_is_required() {
        let mut event = pair_event(50.0);
        event.trigger = false;
        assert!(select_pairs(&Dataset::new(vec![event]), &cuts()).is_empty());
    }

    #[test]
    fn test_exactly_two_required() {
        let mut one = pair_event(50.0);
        one.photons.truncate(1);
        let mut three = pair_event(50.0);
        three.photons.push(good_photon(30.0));
        let dataset = Dataset::new(vec![one, three, pair_event(50.0)]);
        assert_eq!(select_pairs(&dataset, &cuts()).len(), 1);
    }

    #[test]
    fn test_third_photon_never_unlocks_selection_at_higher_cuts() {
        // Three photons at 60/60/20 GeV. Requiring exactly two photons in
        // the event keeps the selection monotone in pt_min: the event is
        // dropped at every threshold, not admitted once the soft photon
        // falls below a raised cut.
        let event = EventData {
            photons: vec![good_photon(60.0), good_photon(60.0), good_photon(20.0)],
            trigger: true,
        };
        let dataset = Dataset::new(vec![event]);
        let loose = Cuts {
            pt_min: 10.0,
            ..cuts()
        };
        let tight = Cuts {
            pt_min: 30.0,
            ..cuts()
        };
        assert!(select_pairs(&dataset, &loose).is_empty());
        assert!(select_pairs(&dataset, &tight).is_empty());
    }

    #[test]
    fn test_crack_region_excluded() {
        let mut event = pair_event(50.0);
        event.photons[0].eta = 1.45;
        assert!(select_pairs(&Dataset::new(vec![event]), &cuts()).is_empty());
        // Just outside the crack is accepted.
        let mut event = pair_event(50.0);
        event.photons[0].eta = -1.53;
        assert_eq!(select_pairs(&Dataset::new(vec![event]), &cuts()).len(), 1);
    }

    #[test]
    fn test_eta_acceptance_window() {
        let mut event = pair_event(50.0);
        event.photons[1].eta = 2.40;
        assert!(select_pairs(&Dataset::new(vec![event]), &cuts()).is_empty());
    }

    #[test]
    fn test_isolation_rejects_event_not_photon() {
        let mut event = pair_event(50.0);
        event.photons[1].ptcone30 = event.photons[1].pt; // ratio 1.0
        assert!(select_pairs(&Dataset::new(vec![event]), &cuts()).is_empty());
    }

    #[test]
    fn test_pt_threshold_applies_to_both_photons() {
        // Trailing photon at 40 GeV fails a 45 GeV cut, dropping the event.
        let dataset = Dataset::new(vec![pair_event(50.0)]);
        let tight = Cuts {
            pt_min: 45.0,
            ..cuts()
        };
        assert!(select_pairs(&dataset, &tight).is_empty());
    }
}
