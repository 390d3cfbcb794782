//! Baxandall two-band tone stack.
//!
//! The classic bass/treble network: the bass pot halves are bridged by
//! capacitors (shelving the lows), the treble pot halves couple through
//! series capacitors (shelving the highs), and both wipers meet at the
//! output node. The bridge does not decompose into series/parallel
//! pairs, so a passive six-leg R-type root ties the branches together
//! across the two circuit nodes:
//!
//! - A: input source (IN–gnd)
//! - B: R1 + (bass pot upper ∥ Cb)   (IN–OUT)
//! - C: (bass pot lower ∥ Cb) + R2   (OUT–gnd)
//! - D: Ct + treble pot upper        (IN–OUT)
//! - E: treble pot lower + Ct        (OUT–gnd)
//! - F: load                         (OUT–gnd)
//!
//! At center both branch pairs are symmetric at every frequency, so the
//! divider sits at 1/2 regardless of the caps; the fixed makeup gain of
//! 2 brings the flat setting to unity. The scattering matrix is the
//! closed-form solution of the two-node bridge in the leg conductances,
//! evaluated only on parameter changes.

use serde::{Deserialize, Serialize};

use super::clamp_pot;
use crate::propagation::PropagationScope;
use crate::rtype::RootAdaptor;
use crate::tree::{NodeId, TreeError, WdfTree};
use crate::CircuitProcessor;

/// Normalized tone-stack parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BaxandallParams {
    /// Bass, 0–1. 0.5 is flat; 1 boosts the lows.
    pub bass: f64,
    /// Treble, 0–1. 0.5 is flat; 1 boosts the highs.
    pub treble: f64,
}

impl Default for BaxandallParams {
    fn default() -> Self {
        Self {
            bass: 0.5,
            treble: 0.5,
        }
    }
}

const SOURCE_RESISTANCE: f64 = 100.0;
const R1: f64 = 10.0e3;
const R2: f64 = 10.0e3;
const BASS_POT: f64 = 100.0e3;
const TREBLE_POT: f64 = 100.0e3;
const BASS_CAP: f64 = 22e-9;
const TREBLE_CAP: f64 = 6.8e-9;
const LOAD: f64 = 1.0e6;
const MAKEUP_GAIN: f64 = 2.0;

/// Scattering matrix of the two-node bridge.
///
/// Ports A/B/D hang between IN and ground/OUT, C/E/F between OUT and
/// ground. The 2×2 nodal system in (v_in, v_out) solves in closed form;
/// each column is the port-voltage response to a unit incident wave on
/// one port, `S[k][j] = 2 v_k - δ_kj`.
fn scattering(r: &[f64; 6], s: &mut [[f64; 6]; 6]) {
    let [ga, gb, gc, gd, ge, gf] = [
        1.0 / r[0],
        1.0 / r[1],
        1.0 / r[2],
        1.0 / r[3],
        1.0 / r[4],
        1.0 / r[5],
    ];
    let gx = gb + gd; // bridge conductance IN <-> OUT
    let g11 = ga + gx;
    let g22 = gx + gc + ge + gf;
    let det = g11 * g22 - gx * gx;

    // Unit-excitation injections (at IN, at OUT) per port.
    let inject = [
        (ga, 0.0),
        (gb, -gb),
        (0.0, gc),
        (gd, -gd),
        (0.0, ge),
        (0.0, gf),
    ];
    for (j, (i_in, i_out)) in inject.iter().enumerate() {
        let v_in = (g22 * i_in + gx * i_out) / det;
        let v_out = (gx * i_in + g11 * i_out) / det;
        let port_v = [v_in, v_in - v_out, v_out, v_in - v_out, v_out, v_out];
        for (k, vk) in port_v.iter().enumerate() {
            let delta = if k == j { 1.0 } else { 0.0 };
            s[k][j] = 2.0 * vk - delta;
        }
    }
}

pub struct Baxandall {
    tree: WdfTree,
    source: NodeId,
    bass_upper: NodeId,
    bass_lower: NodeId,
    treble_upper: NodeId,
    treble_lower: NodeId,
    load: NodeId,
    root: RootAdaptor<6, fn(&[f64; 6], &mut [[f64; 6]; 6])>,
}

impl Baxandall {
    pub fn new(sample_rate: f64) -> Result<Self, TreeError> {
        let mut tree = WdfTree::new(sample_rate);

        let source = tree.resistive_source(SOURCE_RESISTANCE)?;

        let bass_upper = tree.resistor(BASS_POT * 0.5)?;
        let cb1 = tree.capacitor(BASS_CAP)?;
        let r1 = tree.resistor(R1)?;
        let upper_pair = tree.parallel(bass_upper, cb1)?;
        let leg_b = tree.series(r1, upper_pair)?;

        let bass_lower = tree.resistor(BASS_POT * 0.5)?;
        let cb2 = tree.capacitor(BASS_CAP)?;
        let r2 = tree.resistor(R2)?;
        let lower_pair = tree.parallel(bass_lower, cb2)?;
        let leg_c = tree.series(lower_pair, r2)?;

        let ct1 = tree.capacitor(TREBLE_CAP)?;
        let treble_upper = tree.resistor(TREBLE_POT * 0.5)?;
        let leg_d = tree.series(ct1, treble_upper)?;

        let treble_lower = tree.resistor(TREBLE_POT * 0.5)?;
        let ct2 = tree.capacitor(TREBLE_CAP)?;
        let leg_e = tree.series(treble_lower, ct2)?;

        let load = tree.resistor(LOAD)?;

        let root = RootAdaptor::new(
            &tree,
            [source, leg_b, leg_c, leg_d, leg_e, load],
            scattering as fn(&[f64; 6], &mut [[f64; 6]; 6]),
        )?;

        Ok(Self {
            tree,
            source,
            bass_upper,
            bass_lower,
            treble_upper,
            treble_lower,
            load,
            root,
        })
    }

    /// Split both pots around their wipers in one propagation
    /// transaction. Positions are clamped so no half collapses to zero.
    pub fn set_params(&mut self, params: &BaxandallParams) {
        let bass = clamp_pot(params.bass);
        let treble = clamp_pot(params.treble);

        let mut scope = PropagationScope::new(&mut self.tree, &mut self.root);
        scope.set_resistance(self.bass_upper, (1.0 - bass) * BASS_POT);
        scope.set_resistance(self.bass_lower, bass * BASS_POT);
        scope.set_resistance(self.treble_upper, (1.0 - treble) * TREBLE_POT);
        scope.set_resistance(self.treble_lower, treble * TREBLE_POT);
    }
}

impl CircuitProcessor for Baxandall {
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
        MAKEUP_GAIN * self.tree.voltage(self.load)
    }

    fn reset(&mut self) {
        self.tree.reset();
    }
}
