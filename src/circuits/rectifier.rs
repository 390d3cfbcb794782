//! Diode rectifier: half-wave rectification with a variable corner.
//!
//! A resistive voltage source whose series resistance is derived from
//! the cutoff control (`R = 1/(2π fc C)`) drives a capacitor in
//! parallel, clamped by a single diode at the root. Drive maps to a
//! 0.5×–10× input gain with a compensating output gain; the output
//! polarity is flipped so the rectified lobe is positive.

use serde::{Deserialize, Serialize};

use super::clamp_unit;
use crate::elements::{DiodeRoot, DiodeType, WdfRoot};
use crate::propagation::{PropagationScope, SubtreeRoot};
use crate::tree::{NodeId, TreeError, WdfTree};
use crate::CircuitProcessor;

/// Normalized rectifier parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RectifierParams {
    /// Corner frequency in Hz, clamped to 200 Hz – 20 kHz.
    pub cutoff_hz: f64,
    /// Drive, 0–1. Maps to input gain 0.5×–10×.
    pub drive: f64,
    pub diode: DiodeType,
    pub diode_count: u32,
}

impl Default for RectifierParams {
    fn default() -> Self {
        Self {
            cutoff_hz: 2000.0,
            drive: 0.5,
            diode: DiodeType::Silicon,
            diode_count: 1,
        }
    }
}

const CAPACITANCE: f64 = 47e-9;
const CUTOFF_MIN: f64 = 200.0;
const CUTOFF_MAX: f64 = 20.0e3;

pub struct DiodeRectifier {
    tree: WdfTree,
    source: NodeId,
    top: NodeId,
    root: SubtreeRoot,
    diode: DiodeRoot,
    in_gain: f64,
    out_gain: f64,
}

impl DiodeRectifier {
    pub fn new(sample_rate: f64) -> Result<Self, TreeError> {
        let mut tree = WdfTree::new(sample_rate);
        let params = RectifierParams::default();
        let source = tree.resistive_source(cutoff_to_resistance(params.cutoff_hz))?;
        let cap = tree.capacitor(CAPACITANCE)?;
        let top = tree.parallel(source, cap)?;

        let mut rectifier = Self {
            tree,
            source,
            top,
            root: SubtreeRoot(top),
            diode: DiodeRoot::new(params.diode.model()),
            in_gain: 1.0,
            out_gain: -1.0,
        };
        rectifier.set_params(&params);
        Ok(rectifier)
    }

    pub fn set_params(&mut self, params: &RectifierParams) {
        self.diode
            .set_model(params.diode.model().series(params.diode_count.max(1)));

        let gain = 0.5 + clamp_unit(params.drive) * 9.5;
        self.in_gain = gain;
        // Compensate level, flipping polarity so the rectified wave is
        // positive.
        self.out_gain = -if gain < 1.0 { 1.0 / gain } else { 1.0 / gain.sqrt() };

        let mut scope = PropagationScope::new(&mut self.tree, &mut self.root);
        scope.set_resistance(self.source, cutoff_to_resistance(params.cutoff_hz));
    }
}

fn cutoff_to_resistance(cutoff_hz: f64) -> f64 {
    let fc = cutoff_hz.clamp(CUTOFF_MIN, CUTOFF_MAX);
    1.0 / (2.0 * std::f64::consts::PI * fc * CAPACITANCE)
}

impl CircuitProcessor for DiodeRectifier {
    fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        {
            let mut scope = PropagationScope::new(&mut self.tree, &mut self.root);
            scope.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        self.tree
            .set_source_voltage(self.source, self.in_gain * input);
        let b = self.tree.reflected(self.top);
        let a = self.diode.process(b, self.tree.port_resistance(self.top));
        self.tree.set_incident(self.top, a);
        self.out_gain * (a + b) / 2.0
    }

    fn reset(&mut self) {
        self.tree.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 48000.0;

    #[test]
    fn derived_impedances_positive_over_full_parameter_range() {
        for cutoff in [0.0, 200.0, 2000.0, 20_000.0, 1.0e6] {
            let r = cutoff_to_resistance(cutoff);
            assert!(r > 0.0 && r.is_finite(), "cutoff {cutoff} -> {r}");
        }
    }

    #[test]
    fn output_is_rectified() {
        // Bipolar input, drive at the midpoint: the output never swings
        // below one scaled diode drop, while the positive lobe passes.
        let mut r = DiodeRectifier::new(FS).unwrap();
        r.set_params(&RectifierParams::default());
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for i in 0..48000 {
            let y = r.process_sample((2.0 * std::f64::consts::PI * 220.0 * i as f64 / FS).sin());
            if i > 100 {
                lo = lo.min(y);
                hi = hi.max(y);
            }
        }
        assert!(lo > -0.35, "negative floor bounded by diode drop: {lo}");
        assert!(hi > 1.0, "positive lobe passes: {hi}");
    }

    #[test]
    fn germanium_floor_is_tighter() {
        let mut r = DiodeRectifier::new(FS).unwrap();
        r.set_params(&RectifierParams {
            diode: DiodeType::Germanium,
            ..RectifierParams::default()
        });
        let mut lo = f64::INFINITY;
        for i in 0..48000 {
            let y = r.process_sample((2.0 * std::f64::consts::PI * 220.0 * i as f64 / FS).sin());
            if i > 100 {
                lo = lo.min(y);
            }
        }
        assert!(lo > -0.15, "germanium drop is smaller: {lo}");
    }

    #[test]
    fn dc_zero_is_stable() {
        let mut r = DiodeRectifier::new(FS).unwrap();
        for _ in 0..1000 {
            assert!(r.process_sample(0.0).abs() < 1e-9);
        }
    }

    #[test]
    fn cutoff_sweep_is_continuous() {
        let mut r = DiodeRectifier::new(FS).unwrap();
        let mut prev = r.process_sample(0.3);
        let mut max_delta = 0.0_f64;
        for step in 1..=100 {
            r.set_params(&RectifierParams {
                cutoff_hz: 200.0 + 19_800.0 * step as f64 / 100.0,
                ..RectifierParams::default()
            });
            for _ in 0..32 {
                let y = r.process_sample(0.3);
                max_delta = max_delta.max((y - prev).abs());
                prev = y;
            }
        }
        assert!(max_delta < 0.15, "cutoff sweep discontinuity: {max_delta}");
    }
}
