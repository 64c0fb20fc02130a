use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use serde::{Deserialize, Serialize};

/// A four-momentum in Cartesian components.
///
/// Detector-level photon kinematics are recorded in polar form (transverse
/// momentum, pseudorapidity, azimuth, energy); [`Vec4::from_polar`] performs
/// the conversion. The metric signature is (+, −, −, −), so
/// [`mag2`](Vec4::mag2) is the invariant mass squared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
}

impl Vec4 {
    pub const fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Build a four-momentum from detector coordinates:
    /// `px = pt cos φ`, `py = pt sin φ`, `pz = pt sinh η`.
    pub fn from_polar(pt: f64, eta: f64, phi: f64, e: f64) -> Self {
        Self {
            px: pt * phi.cos(),
            py: pt * phi.sin(),
            pz: pt * eta.sinh(),
            e,
        }
    }

    /// Transverse momentum, `√(px² + py²)`.
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Azimuthal angle in (−π, π].
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Pseudorapidity, `asinh(pz / pt)`.
    pub fn eta(&self) -> f64 {
        (self.pz / self.pt()).asinh()
    }

    /// Squared magnitude of the spatial part.
    pub fn p_mag2(&self) -> f64 {
        self.px * self.px + self.py * self.py + self.pz * self.pz
    }

    /// Invariant mass squared, `E² − |p|²`. May be negative for unphysical
    /// or numerically marginal inputs; see [`mass`](Vec4::mass).
    pub fn mag2(&self) -> f64 {
        self.e * self.e - self.p_mag2()
    }

    /// Invariant mass with the negative-radicand floor.
    ///
    /// A radicand below zero yields a mass of exactly zero rather than a NaN
    /// so that malformed physics edge cases never propagate.
    pub fn mass(&self) -> f64 {
        self.mag2().max(0.0).sqrt()
    }

    fn add(&self, other: &Self) -> Self {
        Self {
            px: self.px + other.px,
            py: self.py + other.py,
            pz: self.pz + other.pz,
            e: self.e + other.e,
        }
    }

    fn sub(&self, other: &Self) -> Self {
        Self {
            px: self.px - other.px,
            py: self.py - other.py,
            pz: self.pz - other.pz,
            e: self.e - other.e,
        }
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            px: self.px * factor,
            py: self.py * factor,
            pz: self.pz * factor,
            e: self.e * factor,
        }
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { a.add(b) });
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 { a.sub(b) });
impl_op_ex!(-|a: &Vec4| -> Vec4 { a.scale(-1.0) });
impl_op_ex_commutative!(*|a: &Vec4, b: &f64| -> Vec4 { a.scale(*b) });

impl std::iter::Sum for Vec4 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, v| acc + v)
    }
}
