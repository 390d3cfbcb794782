//! WDF circuit elements — traits and implementations.
//!
//! - [`WdfLeaf`] — one-port elements (R, C, resistive source) that
//!   terminate tree branches
//! - [`WdfRoot`] — nonlinear elements (diode configurations) that sit at
//!   the unadapted tree root
//!
//! Adaptors (series, parallel) live in the `tree` module as they are
//! structural rather than electrical.

mod linear;
mod nonlinear;

pub use linear::*;
pub use nonlinear::*;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One-port WDF leaf element.
///
/// Leaves sit at the ends of the WDF tree and exchange incident (`a`)
/// and reflected (`b`) waves with their parent adaptor. Voltage and
/// current at the port are `v = (a + b) / 2` and `i = (a - b) / (2 Rp)`.
pub trait WdfLeaf {
    /// Port resistance looking into this element (Ω). Strictly positive
    /// and finite for every valid element.
    fn port_resistance(&self) -> f64;

    /// Produce the reflected wave from current state.
    ///
    /// Resistor: `b = 0` (matched termination).
    /// Capacitor: `b = z⁻¹ a` (previous incident wave).
    /// Resistive voltage source: `b = Vs`.
    fn reflected(&mut self) -> f64;

    /// Accept the incident wave from the downward pass. Reactive
    /// elements latch it as state for the next sample.
    fn set_incident(&mut self, a: f64);

    /// Update sample-rate-derived impedance (reactive elements only).
    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    /// Zero internal state.
    fn reset(&mut self) {}
}

/// Nonlinear element at the unadapted root of a WDF tree.
///
/// Solves the implicit port equation `i(v) = (a - v) / Rp` for the
/// element's I-V law and returns the reflected wave `b = 2v - a`.
/// Implementations are bounded-time: a closed form or a fixed
/// iteration budget, never an unbounded loop.
pub trait WdfRoot {
    fn process(&mut self, incident: f64, port_resistance: f64) -> f64;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistor_reflects_zero() {
        let mut r = Resistor::new(1000.0);
        assert_eq!(r.reflected(), 0.0);
    }

    #[test]
    fn capacitor_port_resistance() {
        let c = Capacitor::new(220e-9, 48000.0);
        let expected = 1.0 / (2.0 * 48000.0 * 220e-9);
        assert!((c.port_resistance() - expected).abs() < 1e-9);
    }

    #[test]
    fn capacitor_reflects_previous_incident() {
        let mut c = Capacitor::new(220e-9, 48000.0);
        assert_eq!(c.reflected(), 0.0);
        c.set_incident(0.5);
        assert_eq!(c.reflected(), 0.5);
    }

    #[test]
    fn capacitor_sample_rate_update() {
        let mut c = Capacitor::new(100e-9, 48000.0);
        c.set_sample_rate(96000.0);
        let expected = 1.0 / (2.0 * 96000.0 * 100e-9);
        assert!((c.port_resistance() - expected).abs() < 1e-9);
    }

    #[test]
    fn open_reflects_short_inverts() {
        let mut open = OpenCircuit::new();
        open.set_incident(0.3);
        assert_eq!(open.reflected(), 0.3, "open: zero current, v = a");

        let mut short = ShortCircuit::new();
        short.set_incident(0.3);
        assert_eq!(short.reflected(), -0.3, "short: zero voltage, b = -a");
        short.set_incident(0.3);
        assert_eq!((0.3 + short.reflected()) / 2.0, 0.0);
    }

    #[test]
    fn resistive_source_reflects_voltage() {
        let mut vs = ResistiveVoltageSource::new(1000.0);
        vs.set_voltage(0.7);
        assert_eq!(vs.reflected(), 0.7);
        assert_eq!(vs.port_resistance(), 1000.0);
    }

    #[test]
    fn diode_pair_clips_large_input() {
        let mut diode = DiodePairRoot::new(DiodeModel::silicon());
        let a = 20.0;
        let b = diode.process(a, 10_000.0);
        let v = (a + b) / 2.0;
        assert!(v > 0.4 && v < 1.0, "silicon pair should clip near 0.6V: {v}");
    }

    #[test]
    fn diode_pair_zero_input() {
        let mut diode = DiodePairRoot::new(DiodeModel::silicon());
        let b = diode.process(0.0, 1000.0);
        assert!(b.abs() < 1e-6, "zero in, zero out: {b}");
    }

    #[test]
    fn diode_pair_symmetry() {
        let mut diode = DiodePairRoot::new(DiodeModel::silicon());
        let rp = 10_000.0;
        for a in [0.5, 1.0, 2.0, 5.0, 10.0] {
            let v_pos = (a + diode.process(a, rp)) / 2.0;
            let v_neg = (-a + diode.process(-a, rp)) / 2.0;
            assert!(
                (v_pos + v_neg).abs() < 1e-3,
                "pair should be symmetric: v+={v_pos:.4}, v-={v_neg:.4}"
            );
        }
    }

    #[test]
    fn germanium_clips_lower_than_silicon() {
        let mut ge = DiodePairRoot::new(DiodeModel::germanium());
        let mut si = DiodePairRoot::new(DiodeModel::silicon());
        let rp = 10_000.0;
        let v_ge = (10.0 + ge.process(10.0, rp)) / 2.0;
        let v_si = (10.0 + si.process(10.0, rp)) / 2.0;
        assert!(v_ge < v_si, "Ge clips earlier: Ge={v_ge:.4}, Si={v_si:.4}");
        assert!(v_ge > 0.15 && v_ge < 0.5, "Ge forward voltage: {v_ge:.4}");
    }

    #[test]
    fn led_clips_higher_than_silicon() {
        let mut led = DiodePairRoot::new(DiodeModel::led());
        let mut si = DiodePairRoot::new(DiodeModel::silicon());
        let rp = 10_000.0;
        let v_led = (20.0 + led.process(20.0, rp)) / 2.0;
        let v_si = (20.0 + si.process(20.0, rp)) / 2.0;
        assert!(v_led > v_si, "LED clips later: LED={v_led:.4}, Si={v_si:.4}");
        assert!(v_led > 1.2 && v_led < 2.5, "LED forward voltage: {v_led:.4}");
    }

    #[test]
    fn series_count_raises_clip_threshold() {
        let mut one = DiodePairRoot::new(DiodeModel::silicon());
        let mut two = DiodePairRoot::new(DiodeModel::silicon().series(2));
        let rp = 10_000.0;
        let v1 = (20.0 + one.process(20.0, rp)) / 2.0;
        let v2 = (20.0 + two.process(20.0, rp)) / 2.0;
        assert!(
            v2 > 1.5 * v1,
            "two diodes in series should roughly double the knee: {v1:.3} vs {v2:.3}"
        );
    }

    #[test]
    fn single_diode_rectifies() {
        let mut diode = DiodeRoot::new(DiodeModel::silicon());
        let rp = 10_000.0;
        let v_fwd = (20.0 + diode.process(20.0, rp)) / 2.0;
        let v_rev = (-5.0 + diode.process(-5.0, rp)) / 2.0;
        assert!(v_fwd > 0.4 && v_fwd < 1.0, "forward clamps: {v_fwd:.4}");
        // Reverse bias blocks: no current flows, so the full incident
        // potential appears across the diode.
        assert!((v_rev - (-5.0)).abs() < 0.01, "reverse blocks: {v_rev:.4}");
    }

    #[test]
    fn asymmetric_pair_clips_asymmetrically() {
        let mut pair = AsymmetricDiodePairRoot::new(DiodeModel::silicon(), 1, 2);
        let rp = 10_000.0;
        let v_pos = (5.0 + pair.process(5.0, rp)) / 2.0;
        let v_neg = (-5.0 + pair.process(-5.0, rp)) / 2.0;
        assert!(
            v_neg.abs() > 1.5 * v_pos.abs(),
            "two-diode side should clip later: v+={v_pos:.4}, v-={v_neg:.4}"
        );
    }

    #[test]
    fn diode_solvers_converge_on_extreme_inputs() {
        let mut pair = DiodePairRoot::new(DiodeModel::silicon());
        let mut single = DiodeRoot::new(DiodeModel::silicon());
        let mut asym = AsymmetricDiodePairRoot::new(DiodeModel::silicon(), 1, 3);
        for a in [0.0, 0.001, 0.1, 1.0, 10.0, 100.0, 1000.0] {
            for rp in [1.0, 100.0, 10_000.0, 1.0e6] {
                for sign in [1.0, -1.0] {
                    let x = sign * a;
                    assert!(pair.process(x, rp).is_finite(), "pair a={x} rp={rp}");
                    assert!(single.process(x, rp).is_finite(), "single a={x} rp={rp}");
                    assert!(asym.process(x, rp).is_finite(), "asym a={x} rp={rp}");
                }
            }
        }
    }
}
