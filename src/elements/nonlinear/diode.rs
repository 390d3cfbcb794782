//! Diode WDF root elements: antiparallel pair, single diode, asymmetric pair.
//!
//! Symmetric configurations use the closed-form Wright-omega solution of
//! the Shockley equation against the port; asymmetric pairs (unequal
//! series counts per direction) have no closed form and fall back to
//! bounded Newton-Raphson.

use serde::{Deserialize, Serialize};

use super::{newton_raphson_solve, wright_omega};
use crate::elements::WdfRoot;

// ---------------------------------------------------------------------------
// Diode models
// ---------------------------------------------------------------------------

/// Selectable diode families for clipping/rectification stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiodeType {
    /// 1N4148/1N914 small-signal silicon, Vf ≈ 0.6–0.7 V.
    Silicon,
    /// 1N34A germanium point-contact, Vf ≈ 0.3 V.
    Germanium,
    /// Red LED, Vf ≈ 1.7 V.
    Led,
}

impl DiodeType {
    pub fn model(self) -> DiodeModel {
        match self {
            DiodeType::Silicon => DiodeModel::silicon(),
            DiodeType::Germanium => DiodeModel::germanium(),
            DiodeType::Led => DiodeModel::led(),
        }
    }
}

/// Shockley model parameters.
#[derive(Debug, Clone, Copy)]
pub struct DiodeModel {
    /// Saturation current (A).
    pub is: f64,
    /// Thermal voltage times ideality factor (V), scaled by the number
    /// of diodes in series.
    pub n_vt: f64,
}

impl DiodeModel {
    /// 1N4148 fitted to Vf = 0.62 V at 1 mA.
    pub fn silicon() -> Self {
        Self {
            is: 2.52e-9,
            n_vt: 1.752 * 25.85e-3,
        }
    }

    /// 1N34A germanium.
    pub fn germanium() -> Self {
        Self {
            is: 2.0e-6,
            n_vt: 1.25 * 25.85e-3,
        }
    }

    /// Red LED, Vf ≈ 1.7 V at 10 mA.
    pub fn led() -> Self {
        Self {
            is: 4.5e-17,
            n_vt: 2.0 * 25.85e-3,
        }
    }

    /// `count` identical diodes in series: forward drops add, which is
    /// equivalent to scaling the effective thermal voltage.
    pub fn series(self, count: u32) -> Self {
        Self {
            is: self.is,
            n_vt: self.n_vt * f64::from(count.max(1)),
        }
    }
}

// ---------------------------------------------------------------------------
// Antiparallel diode pair (closed form)
// ---------------------------------------------------------------------------

/// Antiparallel diode pair at the tree root — symmetric soft clipping.
///
/// First-order closed form: the reverse diode's leakage is neglected
/// while the forward diode conducts, which leaves the single-diode
/// omega solution applied in the direction of the incident wave.
#[derive(Debug, Clone, Copy)]
pub struct DiodePairRoot {
    pub model: DiodeModel,
}

impl DiodePairRoot {
    pub fn new(model: DiodeModel) -> Self {
        Self { model }
    }

    pub fn set_model(&mut self, model: DiodeModel) {
        self.model = model;
    }
}

impl WdfRoot for DiodePairRoot {
    #[inline]
    fn process(&mut self, a: f64, rp: f64) -> f64 {
        let nvt = self.model.n_vt;
        let r_is = rp * self.model.is;
        let lambda = if a >= 0.0 { 1.0 } else { -1.0 };
        let x = (r_is / nvt).ln() + (lambda * a + r_is) / nvt;
        a + 2.0 * lambda * (r_is - nvt * wright_omega(x))
    }
}

// ---------------------------------------------------------------------------
// Single diode (closed form)
// ---------------------------------------------------------------------------

/// Single diode at the tree root — rectification / asymmetric clamping.
///
/// Exact closed form of `Is (e^{v/nVt} - 1) = (a - v)/Rp` via the Wright
/// omega function:
///
/// `b = a + 2 Rp Is - 2 nVt ω(ln(Rp Is / nVt) + (a + Rp Is)/nVt)`
#[derive(Debug, Clone, Copy)]
pub struct DiodeRoot {
    pub model: DiodeModel,
}

impl DiodeRoot {
    pub fn new(model: DiodeModel) -> Self {
        Self { model }
    }

    pub fn set_model(&mut self, model: DiodeModel) {
        self.model = model;
    }
}

impl WdfRoot for DiodeRoot {
    #[inline]
    fn process(&mut self, a: f64, rp: f64) -> f64 {
        let nvt = self.model.n_vt;
        let r_is = rp * self.model.is;
        let x = (r_is / nvt).ln() + (a + r_is) / nvt;
        a + 2.0 * r_is - 2.0 * nvt * wright_omega(x)
    }
}

// ---------------------------------------------------------------------------
// Asymmetric pair (Newton-Raphson)
// ---------------------------------------------------------------------------

/// Antiparallel pair with different series counts per direction
/// (e.g. 1 up / 2 down for TS808-style asymmetric clipping).
///
/// No closed form exists for unequal effective thermal voltages, so the
/// port equation is solved with the bounded Newton-Raphson solver.
#[derive(Debug, Clone, Copy)]
pub struct AsymmetricDiodePairRoot {
    model: DiodeModel,
    n_vt_fwd: f64,
    n_vt_rev: f64,
    max_iter: usize,
}

impl AsymmetricDiodePairRoot {
    pub fn new(model: DiodeModel, count_fwd: u32, count_rev: u32) -> Self {
        Self {
            model,
            n_vt_fwd: model.n_vt * f64::from(count_fwd.max(1)),
            n_vt_rev: model.n_vt * f64::from(count_rev.max(1)),
            max_iter: 16,
        }
    }

    pub fn set_counts(&mut self, count_fwd: u32, count_rev: u32) {
        self.n_vt_fwd = self.model.n_vt * f64::from(count_fwd.max(1));
        self.n_vt_rev = self.model.n_vt * f64::from(count_rev.max(1));
    }
}

impl WdfRoot for AsymmetricDiodePairRoot {
    #[inline]
    fn process(&mut self, a: f64, rp: f64) -> f64 {
        let is = self.model.is;
        let (vf, vr) = (self.n_vt_fwd, self.n_vt_rev);

        // Initial guess: linear for small drive, logarithmic estimate of
        // the conducting diode's knee for large drive.
        let nvt = if a >= 0.0 { vf } else { vr };
        let v0 = if a.abs() < 10.0 * nvt {
            a * 0.5
        } else {
            a.signum() * nvt * (a.abs() / (2.0 * rp * is)).max(1.0).ln()
        };

        newton_raphson_solve(a, rp, v0, self.max_iter, 1e-9, |v| {
            let xf = (v / vf).clamp(-500.0, 500.0);
            let xr = (-v / vr).clamp(-500.0, 500.0);
            let ef = xf.exp();
            let er = xr.exp();
            (is * (ef - er), is * (ef / vf + er / vr))
        })
    }
}
