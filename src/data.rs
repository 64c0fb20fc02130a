use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::utils::vectors::Vec4;

/// Source resolution and remote materialization.
pub mod fetch;
/// Parquet read/write implementations.
pub mod io;

/// A reconstructed photon candidate as recorded in the input file.
///
/// Momentum and energy are in GeV; `ptcone30` and `etcone20` are the
/// isolation-cone energy sums used by [`Cuts`](crate::selection::Cuts).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Photon {
    /// Transverse momentum [GeV].
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle [rad].
    pub phi: f64,
    /// Energy [GeV].
    pub e: f64,
    /// Tight identification-quality flag.
    pub is_tight_id: bool,
    /// Track-isolation cone energy [GeV].
    pub ptcone30: f64,
    /// Calorimeter-isolation cone energy [GeV].
    pub etcone20: f64,
}

impl Photon {
    /// The photon's four-momentum in Cartesian components.
    pub fn p4(&self) -> Vec4 {
        Vec4::from_polar(self.pt, self.eta, self.phi, self.e)
    }
}

/// One collision record: a variable-length photon collection plus the
/// di-photon trigger flag. Immutable once loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    /// The photon candidates recorded for this event, in file order.
    pub photons: Vec<Photon>,
    /// Whether the event fired the di-photon trigger.
    pub trigger: bool,
}

/// An in-memory collection of [`EventData`].
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub events: Vec<EventData>,
}

impl Dataset {
    pub fn new(events: Vec<EventData>) -> Self {
        Self { events }
    }

    /// The number of events in the dataset.
    pub fn n_events(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventData> {
        self.events.iter()
    }
}

/// Generate a deterministic mock dataset for the `demo` subcommand and for
/// tests.
///
/// Roughly 80% of events contain a photon pair drawn from a decay of a
/// parent of mass `125` GeV-ish kinematics; the rest carry soft single
/// photons or empty collections. A fixed `seed` always yields the identical
/// dataset.
pub fn synthetic_dataset(n_events: usize, seed: u64) -> Dataset {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut events = Vec::with_capacity(n_events);
    for _ in 0..n_events {
        let trigger = rng.f64() < 0.95;
        let n_photons = match rng.f64() {
            x if x < 0.10 => 0,
            x if x < 0.20 => 1,
            x if x < 0.90 => 2,
            _ => 3,
        };
        let mut photons = Vec::with_capacity(n_photons);
        let phi0 = rng.f64() * 2.0 * PI - PI;
        for i in 0..n_photons {
            let pt = 15.0 + rng.f64() * 70.0;
            let eta = rng.f64() * 5.0 - 2.5;
            // Second photon roughly back-to-back in azimuth.
            let phi = if i == 1 {
                wrap_phi(phi0 + PI + (rng.f64() - 0.5) * 0.2)
            } else {
                wrap_phi(phi0 + (rng.f64() - 0.5) * 0.2)
            };
            let e = pt * eta.cosh();
            photons.push(Photon {
                pt,
                eta,
                phi,
                e,
                is_tight_id: rng.f64() < 0.85,
                ptcone30: pt * rng.f64() * 0.1,
                etcone20: pt * rng.f64() * 0.1,
            });
        }
        events.push(EventData { photons, trigger });
    }
    Dataset::new(events)
}

fn wrap_phi(phi: f64) -> f64 {
    (phi.sin()).atan2(phi.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_photon_four_momentum() {
        let photon = Photon {
            pt: 40.0,
            eta: 0.5,
            phi: 1.0,
            e: 45.0,
            ..Default::default()
        };
        let p4 = photon.p4();
        assert_relative_eq!(p4.pt(), 40.0, max_relative = 1e-12);
        assert_relative_eq!(p4.eta(), 0.5, max_relative = 1e-12);
        assert_relative_eq!(p4.phi(), 1.0, max_relative = 1e-12);
        assert_relative_eq!(p4.e, 45.0);
    }

    #[test]
    fn test_synthetic_dataset_is_deterministic() {
        let a = synthetic_dataset(50, 7);
        let b = synthetic_dataset(50, 7);
        assert_eq!(a.n_events(), 50);
        for (ea, eb) in a.iter().zip(b.iter()) {
            assert_eq!(ea.trigger, eb.trigger);
            assert_eq!(ea.photons.len(), eb.photons.len());
            for (pa, pb) in ea.photons.iter().zip(eb.photons.iter()) {
                assert_eq!(pa.pt.to_bits(), pb.pt.to_bits());
                assert_eq!(pa.phi.to_bits(), pb.phi.to_bits());
            }
        }
    }

    #[test]
    fn test_synthetic_photons_within_detector_bounds() {
        let dataset = synthetic_dataset(200, 1);
        for event in dataset.iter() {
            for photon in &event.photons {
                assert!(photon.pt > 0.0);
                assert!(photon.eta.abs() < 2.5);
                assert!(photon.phi > -PI && photon.phi <= PI);
                assert!(photon.e >= photon.pt);
            }
        }
    }
}
