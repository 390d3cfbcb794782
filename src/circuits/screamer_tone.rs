//! Tube-screamer tone/volume stage.
//!
//! An op-amp tone control modeled as a six-leg R-type root. The op-amp
//! (open-loop gain `Ag`, input impedance `Ri`, output impedance `Ro`)
//! and the surrounding network do not decompose into series/parallel
//! pairs, so the root's scattering matrix is a dense 6×6 whose entries
//! are closed-form rational functions of the leg impedances, derived
//! offline with a symbolic circuit solver and evaluated here only when
//! an impedance changes.
//!
//! Legs:
//! - A: input source (1 kΩ) ∥ 220 nF low-pass capacitor
//! - B: 220 Ω + 220 nF to ground at the inverting input
//! - C/D: tone pot halves (20 kΩ total), wiper at the op-amp + input
//! - E: 1 kΩ feedback resistor
//! - F: 100 kΩ volume pot load + (1 µF + 1 kΩ) coupling branch
//!
//! Output is the voltage across the 100 kΩ load.

use serde::{Deserialize, Serialize};

use super::clamp_pot;
use crate::propagation::PropagationScope;
use crate::rtype::RootAdaptor;
use crate::tree::{NodeId, TreeError, WdfTree};
use crate::CircuitProcessor;

/// Normalized tone-stage parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreamerToneParams {
    /// Tone, 0–1. 0 darkens, 1 lifts treble.
    pub tone: f64,
}

impl Default for ScreamerToneParams {
    fn default() -> Self {
        Self { tone: 0.5 }
    }
}

// Op-amp device constants baked into the offline-derived matrix.
const AG: f64 = 100.0;
const RI: f64 = 1.0e9;
const RO: f64 = 1.0e-1;

const POT_TOTAL: f64 = 20.0e3;

/// Closed-form 6×6 scattering matrix for this topology.
///
/// Entries share one denominator; all are rational in the leg
/// impedances `ra..rf` and the device constants. Generated by the
/// offline solver — do not edit by hand.
#[allow(clippy::all)]
fn scattering(r: &[f64; 6], s: &mut [[f64; 6]; 6]) {
    let [ra, rb, rc, rd, re, rf] = *r;
    let (ag, ri, ro) = (AG, RI, RO);
    let d = (((ag + 1.0) * rb * rc + ra * rb + ((ag + 1.0) * ra + (ag + 1.0) * rb + (ag + 1.0) * rc) * rd + (ra + rb + rc) * re) * rf * ri + (ra * rb * rc + (ra * rb + ra * rc) * rd + ((ra + rb) * rc + (ra + rb + rc) * rd) * re) * rf - (ra * rb * rc + (ra * rb + ra * rc) * rd + ((ra + rb) * rc + (ra + rb + rc) * rd) * re + ((ra + rb) * rc + (ra + rb + rc) * rd) * rf + (ra * rb + rb * rc + (ra + rb + rc) * rd + (ra + rb + rc) * re + (ra + rb + rc) * rf) * ri) * ro);
    s[0][0] = ((((ag + 1.0) * rb * rc - ra * rb - ((ag + 1.0) * ra - (ag + 1.0) * rb - (ag + 1.0) * rc) * rd - (ra - rb - rc) * re) * rf * ri - (ra * rb * rc + (ra * rb + ra * rc) * rd + ((ra - rb) * rc + (ra - rb - rc) * rd) * re) * rf + (ra * rb * rc + (ra * rb + ra * rc) * rd + ((ra - rb) * rc + (ra - rb - rc) * rd) * re + ((ra - rb) * rc + (ra - rb - rc) * rd) * rf + (ra * rb - rb * rc + (ra - rb - rc) * rd + (ra - rb - rc) * re + (ra - rb - rc) * rf) * ri) * ro)) / d;
    s[0][1] = (-2.0 * ((ra * rc + ra * rd) * re * rf + ((ag + 1.0) * ra * rd + ra * re) * rf * ri - ((ra * rc + ra * rd) * re + (ra * rc + ra * rd) * rf + (ra * rd + ra * re + ra * rf) * ri) * ro)) / d;
    s[0][2] = (-2.0 * (ra * rd * re * rf + ((ag + 1.0) * ra * rb + (ag + 1.0) * ra * rd + ra * re) * rf * ri - (ra * rd * re + ra * rd * rf + (ra * rb + ra * rd + ra * re + ra * rf) * ri) * ro)) / d;
    s[0][3] = (2.0 * ((ag + 1.0) * ra * rb * rf * ri - ra * rc * re * rf + (ra * rc * re + ra * rc * rf - ra * rb * ri) * ro)) / d;
    s[0][4] = (2.0 * (ra * rb * rf * ri + (ra * rb * rc + (ra * rb + ra * rc) * rd) * rf - (ra * rb * rc + ra * rb * ri + (ra * rb + ra * rc) * rd) * ro)) / d;
    s[0][5] = (-2.0 * (ra * rb * rc + ra * rb * ri + (ra * rb + ra * rc) * rd) * ro) / d;
    s[1][0] = (-2.0 * ((rb * rc + rb * rd) * re * rf + (ag * rb * rc + (ag + 1.0) * rb * rd + rb * re) * rf * ri - ((rb * rc + rb * rd) * re + (rb * rc + rb * rd) * rf + (rb * rd + rb * re + rb * rf) * ri) * ro)) / d;
    s[1][1] = (-(((ag + 1.0) * rb * rc + ra * rb - ((ag + 1.0) * ra - (ag + 1.0) * rb + (ag + 1.0) * rc) * rd - (ra - rb + rc) * re) * rf * ri + (ra * rb * rc + (ra * rb - ra * rc) * rd - ((ra - rb) * rc + (ra - rb + rc) * rd) * re) * rf - (ra * rb * rc + (ra * rb - ra * rc) * rd - ((ra - rb) * rc + (ra - rb + rc) * rd) * re - ((ra - rb) * rc + (ra - rb + rc) * rd) * rf + (ra * rb + rb * rc - (ra - rb + rc) * rd - (ra - rb + rc) * re - (ra - rb + rc) * rf) * ri) * ro)) / d;
    s[1][2] = (2.0 * ((ag * ra * rb - (ag + 1.0) * rb * rd - rb * re) * rf * ri - (ra * rb * rd + rb * rd * re) * rf + (ra * rb * rd + rb * rd * re + rb * rd * rf + (rb * rd + rb * re + rb * rf) * ri) * ro)) / d;
    s[1][3] = (-2.0 * (((ag + 1.0) * ra * rb + (ag + 1.0) * rb * rc) * rf * ri + (ra * rb * rc + rb * rc * re) * rf - (ra * rb * rc + rb * rc * re + rb * rc * rf + (ra * rb + rb * rc) * ri) * ro)) / d;
    s[1][4] = (-2.0 * ((ra * rb + rb * rc) * rf * ri + (ra * rb * rc + ra * rb * rd) * rf - (ra * rb * rc + ra * rb * rd + (ra * rb + rb * rc) * ri) * ro)) / d;
    s[1][5] = (2.0 * (ra * rb * rc + ra * rb * rd + (ra * rb + rb * rc) * ri) * ro) / d;
    s[2][0] = (-2.0 * (rc * rd * re * rf + ((ag + 1.0) * rc * rd + rb * rc + rc * re) * rf * ri - (rc * rd * re + rc * rd * rf + (rb * rc + rc * rd + rc * re + rc * rf) * ri) * ro)) / d;
    s[2][1] = (-2.0 * (((ag + 1.0) * rc * rd + rc * re) * rf * ri + (ra * rc * rd + rc * rd * re) * rf - (ra * rc * rd + rc * rd * re + rc * rd * rf + (rc * rd + rc * re + rc * rf) * ri) * ro)) / d;
    s[2][2] = (-(((ag + 1.0) * rb * rc - ra * rb - ((ag + 1.0) * ra + (ag + 1.0) * rb - (ag + 1.0) * rc) * rd - (ra + rb - rc) * re) * rf * ri + (ra * rb * rc - (ra * rb - ra * rc) * rd + ((ra + rb) * rc - (ra + rb - rc) * rd) * re) * rf - (ra * rb * rc - (ra * rb - ra * rc) * rd + ((ra + rb) * rc - (ra + rb - rc) * rd) * re + ((ra + rb) * rc - (ra + rb - rc) * rd) * rf - (ra * rb - rb * rc + (ra + rb - rc) * rd + (ra + rb - rc) * re + (ra + rb - rc) * rf) * ri) * ro)) / d;
    s[2][3] = (2.0 * ((ag + 1.0) * rb * rc * rf * ri + (ra * rb * rc + (ra + rb) * rc * re) * rf - (ra * rb * rc + (ra + rb) * rc * re + (ra + rb) * rc * rf + rb * rc * ri) * ro)) / d;
    s[2][4] = (-2.0 * (ra * rc * rd * rf - rb * rc * rf * ri - (ra * rc * rd - rb * rc * ri) * ro)) / d;
    s[2][5] = (2.0 * (ra * rc * rd - rb * rc * ri) * ro) / d;
    s[3][0] = (-2.0 * (rc * rd * re * rf + (ag * rc - rb) * rd * rf * ri - (rc * rd * re + rc * rd * rf - rb * rd * ri) * ro)) / d;
    s[3][1] = (-2.0 * (((ag + 1.0) * rc + ra) * rd * rf * ri + (ra * rc * rd + rc * rd * re) * rf - (ra * rc * rd + rc * rd * re + rc * rd * rf + (ra + rc) * rd * ri) * ro)) / d;
    s[3][2] = (2.0 * ((ag * ra + (ag + 1.0) * rb) * rd * rf * ri + (ra * rb * rd + (ra + rb) * rd * re) * rf - (ra * rb * rd + (ra + rb) * rd * re + (ra + rb) * rd * rf + rb * rd * ri) * ro)) / d;
    s[3][3] = ((((ag + 1.0) * rb * rc + ra * rb - ((ag + 1.0) * ra + (ag + 1.0) * rb + (ag + 1.0) * rc) * rd + (ra + rb + rc) * re) * rf * ri + (ra * rb * rc - (ra * rb + ra * rc) * rd + ((ra + rb) * rc - (ra + rb + rc) * rd) * re) * rf - (ra * rb * rc - (ra * rb + ra * rc) * rd + ((ra + rb) * rc - (ra + rb + rc) * rd) * re + ((ra + rb) * rc - (ra + rb + rc) * rd) * rf + (ra * rb + rb * rc - (ra + rb + rc) * rd + (ra + rb + rc) * re + (ra + rb + rc) * rf) * ri) * ro)) / d;
    s[3][4] = (-2.0 * (ra * rc * rd * rf + (ra + rb + rc) * rd * rf * ri - (ra * rc * rd + (ra + rb + rc) * rd * ri) * ro)) / d;
    s[3][5] = (2.0 * (ra * rc * rd + (ra + rb + rc) * rd * ri) * ro) / d;
    s[4][0] = (-2.0 * ((ag * rc - rb) * re * rf * ri - (rb * rc + (rb + rc) * rd) * re * rf + (rb * re * ri + (rb * rc + (rb + rc) * rd) * re) * ro)) / d;
    s[4][1] = (-2.0 * (((ag + 1.0) * rc + ra) * re * rf * ri + (ra * rc + ra * rd) * re * rf - ((ra + rc) * re * ri + (ra * rc + ra * rd) * re) * ro)) / d;
    s[4][2] = (-2.0 * (ra * rd * re * rf - (ag * ra + (ag + 1.0) * rb) * re * rf * ri - (ra * rd * re - rb * re * ri) * ro)) / d;
    s[4][3] = (-2.0 * (ra * rc * re * rf + ((ag + 1.0) * ra + (ag + 1.0) * rb + (ag + 1.0) * rc) * re * rf * ri - (ra * rc * re + (ra + rb + rc) * re * ri) * ro)) / d;
    s[4][4] = ((((ag + 1.0) * rb * rc + ra * rb + ((ag + 1.0) * ra + (ag + 1.0) * rb + (ag + 1.0) * rc) * rd - (ra + rb + rc) * re) * rf * ri + (ra * rb * rc + (ra * rb + ra * rc) * rd - ((ra + rb) * rc + (ra + rb + rc) * rd) * re) * rf - (ra * rb * rc + (ra * rb + ra * rc) * rd - ((ra + rb) * rc + (ra + rb + rc) * rd) * re + ((ra + rb) * rc + (ra + rb + rc) * rd) * rf + (ra * rb + rb * rc + (ra + rb + rc) * rd - (ra + rb + rc) * re + (ra + rb + rc) * rf) * ri) * ro)) / d;
    s[4][5] = (2.0 * ((ra + rb + rc) * re * ri + ((ra + rb) * rc + (ra + rb + rc) * rd) * re) * ro) / d;
    s[5][0] = (2.0 * ((ag * rb * rc + ag * rc * re + (ag * rb + ag * rc) * rd) * rf * ri - (rb * rf * ri + (rb * rc + (rb + rc) * rd) * rf) * ro)) / d;
    s[5][1] = (-2.0 * ((ag * ra * rd - ag * rc * re) * rf * ri - ((ra + rc) * rf * ri + (ra * rc + ra * rd) * rf) * ro)) / d;
    s[5][2] = (-2.0 * ((ag * ra * rb + ag * ra * rd + (ag * ra + ag * rb) * re) * rf * ri - (ra * rd * rf - rb * rf * ri) * ro)) / d;
    s[5][3] = (2.0 * ((ag * ra * rb + (ag * ra + ag * rb + ag * rc) * re) * rf * ri + (ra * rc * rf + (ra + rb + rc) * rf * ri) * ro)) / d;
    s[5][4] = (-2.0 * ((ag * rb * rc + (ag * ra + ag * rb + ag * rc) * rd) * rf * ri - ((ra + rb + rc) * rf * ri + ((ra + rb) * rc + (ra + rb + rc) * rd) * rf) * ro)) / d;
    s[5][5] = (-(((ag + 1.0) * rb * rc + ra * rb + ((ag + 1.0) * ra + (ag + 1.0) * rb + (ag + 1.0) * rc) * rd + (ra + rb + rc) * re) * rf * ri + (ra * rb * rc + (ra * rb + ra * rc) * rd + ((ra + rb) * rc + (ra + rb + rc) * rd) * re) * rf + (ra * rb * rc + (ra * rb + ra * rc) * rd + ((ra + rb) * rc + (ra + rb + rc) * rd) * re - ((ra + rb) * rc + (ra + rb + rc) * rd) * rf + (ra * rb + rb * rc + (ra + rb + rc) * rd + (ra + rb + rc) * re - (ra + rb + rc) * rf) * ri) * ro)) / d;
}

pub struct ScreamerTone {
    tree: WdfTree,
    source: NodeId,
    pot_low: NodeId,
    pot_high: NodeId,
    load: NodeId,
    root: RootAdaptor<6, fn(&[f64; 6], &mut [[f64; 6]; 6])>,
}

impl ScreamerTone {
    pub fn new(sample_rate: f64) -> Result<Self, TreeError> {
        let mut tree = WdfTree::new(sample_rate);

        // Leg A: input source behind 1 kΩ, low-passed by 220 nF.
        let source = tree.resistive_source(1.0e3)?;
        let c5 = tree.capacitor(0.22e-6)?;
        let leg_a = tree.parallel(source, c5)?;

        // Leg B: 220 Ω + 220 nF from the inverting input to ground.
        let r8 = tree.resistor(220.0)?;
        let c6 = tree.capacitor(0.22e-6)?;
        let leg_b = tree.series(r8, c6)?;

        // Legs C/D: tone pot halves around the wiper.
        let pot_low = tree.resistor(POT_TOTAL * 0.5)?;
        let pot_high = tree.resistor(POT_TOTAL * 0.5)?;

        // Leg E: feedback resistor.
        let r11 = tree.resistor(1.0e3)?;

        // Leg F: volume load plus coupling branch.
        let c7 = tree.capacitor(1.0e-6)?;
        let r12 = tree.resistor(1.0e3)?;
        let coupling = tree.series(c7, r12)?;
        let load = tree.resistor(100.0e3)?;
        let leg_f = tree.series(load, coupling)?;

        let root = RootAdaptor::new(
            &tree,
            [leg_a, leg_b, pot_low, pot_high, r11, leg_f],
            scattering as fn(&[f64; 6], &mut [[f64; 6]; 6]),
        )?;

        Ok(Self {
            tree,
            source,
            pot_low,
            pot_high,
            load,
            root,
        })
    }

    /// Map the tone knob through the original skew curve and split the
    /// pot. The skew clamp keeps both halves strictly positive.
    pub fn set_params(&mut self, params: &ScreamerToneParams) {
        let t = params.tone.clamp(0.0, 1.0) * 2.0 - 1.0;
        let skew = if t == 0.0 {
            0.0
        } else {
            t.abs().powf(0.35).copysign(t)
        };
        let skew = clamp_pot((skew + 1.0) * 0.5);

        let mut scope = PropagationScope::new(&mut self.tree, &mut self.root);
        scope.set_resistance(self.pot_low, skew * POT_TOTAL);
        scope.set_resistance(self.pot_high, (1.0 - skew) * POT_TOTAL);
    }
}

impl CircuitProcessor for ScreamerTone {
    fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        {
            let mut scope = PropagationScope::new(&mut self.tree, &mut self.root);
            scope.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        self.tree.set_source_voltage(self.source, input);
        self.root.compute(&mut self.tree);
        self.tree.voltage(self.load)
    }

    fn reset(&mut self) {
        self.tree.reset();
    }
}
