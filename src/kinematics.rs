use serde::{Deserialize, Serialize};

use crate::data::Photon;
use crate::utils::vectors::Vec4;

/// The derived observable set for one selected photon pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Observables {
    /// Transverse momentum of the summed pair four-vector [GeV].
    pub pt_sum: f64,
    /// Pseudorapidity difference, leading minus trailing.
    pub delta_eta: f64,
    /// Azimuthal difference, wrapped to (−π, π].
    pub delta_phi: f64,
    /// Summed energy [GeV].
    pub e_sum: f64,
    /// Di-photon invariant mass [GeV], floored at zero.
    pub mass: f64,
}

impl Observables {
    /// Names of the observables in reporting order.
    pub const NAMES: &'static [&'static str] =
        &["pt_sum", "delta_eta", "delta_phi", "e_sum", "masses"];

    /// Axis labels keyed like [`NAMES`](Observables::NAMES).
    pub fn label(name: &str) -> &'static str {
        match name {
            "pt_sum" => "pT [GeV]",
            "delta_eta" => "Delta eta",
            "delta_phi" => "Delta phi",
            "e_sum" => "Energy [GeV]",
            "masses" => "Invariant mass m_gg [GeV]",
            _ => "unknown",
        }
    }

    /// The observable value by name, in [`NAMES`](Observables::NAMES) order.
    pub fn get(&self, name: &str) -> f64 {
        match name {
            "pt_sum" => self.pt_sum,
            "delta_eta" => self.delta_eta,
            "delta_phi" => self.delta_phi,
            "e_sum" => self.e_sum,
            "masses" => self.mass,
            _ => f64::NAN,
        }
    }
}

/// Canonical wrap of an azimuthal difference to (−π, π].
fn wrap_delta_phi(delta: f64) -> f64 {
    delta.sin().atan2(delta.cos())
}

/// Reconstruct the derived observables for a selected pair.
///
/// Infallible: kinematically impossible inputs (a summed four-vector with
/// `E² < |p|²`) produce `mass = 0` rather than an error.
pub fn reconstruct(pair: &[Photon; 2]) -> Observables {
    let [leading, trailing] = pair;
    let total = leading.p4() + trailing.p4();
    Observables {
        pt_sum: total.pt(),
        delta_eta: leading.eta - trailing.eta,
        delta_phi: wrap_delta_phi(leading.phi - trailing.phi),
        e_sum: total.e,
        mass: total.mass(),
    }
}
