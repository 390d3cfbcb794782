//! Tube-screamer-style diode soft clipper.
//!
//! ```text
//!        [diode pair root]
//!              |
//!         SeriesAdaptor
//!          /         \
//!   VoltageSource   ParallelAdaptor
//!     (input)        /          \
//!                 Resistor    Capacitor
//! ```
//!
//! The drive knob scales the clipping resistance (log taper); the diode
//! pair at the root bounds the output at the diode forward voltage.

use serde::{Deserialize, Serialize};

use super::clamp_unit;
use crate::elements::{DiodePairRoot, DiodeType, WdfRoot};
use crate::propagation::{PropagationScope, SubtreeRoot};
use crate::tree::{NodeId, TreeError, WdfTree};
use crate::CircuitProcessor;

/// Normalized clipper parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClipperParams {
    /// Drive, 0–1. Maps to the clipping resistance 500 kΩ → 5 kΩ.
    pub drive: f64,
    pub diode: DiodeType,
    /// Diodes in series per direction (raises the clipping threshold).
    pub diode_count: u32,
}

impl Default for ClipperParams {
    fn default() -> Self {
        Self {
            drive: 0.5,
            diode: DiodeType::Silicon,
            diode_count: 1,
        }
    }
}

const CAPACITANCE: f64 = 47e-9;
const R_MAX: f64 = 500.0e3;
const SOURCE_RESISTANCE: f64 = 1.0;

pub struct DiodeClipper {
    tree: WdfTree,
    source: NodeId,
    clip_res: NodeId,
    top: NodeId,
    root: SubtreeRoot,
    diode: DiodePairRoot,
}

impl DiodeClipper {
    pub fn new(sample_rate: f64) -> Result<Self, TreeError> {
        let mut tree = WdfTree::new(sample_rate);
        let source = tree.resistive_source(SOURCE_RESISTANCE)?;
        let clip_res = tree.resistor(drive_to_resistance(0.5))?;
        let cap = tree.capacitor(CAPACITANCE)?;
        let rc = tree.parallel(clip_res, cap)?;
        let top = tree.series(source, rc)?;

        let params = ClipperParams::default();
        Ok(Self {
            tree,
            source,
            clip_res,
            top,
            root: SubtreeRoot(top),
            diode: DiodePairRoot::new(params.diode.model().series(params.diode_count)),
        })
    }

    /// Apply a parameter batch in one propagation transaction.
    /// Capacitor state survives, so knob moves do not click.
    pub fn set_params(&mut self, params: &ClipperParams) {
        self.diode
            .set_model(params.diode.model().series(params.diode_count.max(1)));
        let mut scope = PropagationScope::new(&mut self.tree, &mut self.root);
        scope.set_resistance(self.clip_res, drive_to_resistance(params.drive));
    }
}

fn drive_to_resistance(drive: f64) -> f64 {
    // Two decades of log taper: 500 kΩ down to 5 kΩ.
    R_MAX * 10f64.powf(-2.0 * clamp_unit(drive))
}

impl CircuitProcessor for DiodeClipper {
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
        let b = self.tree.reflected(self.top);
        let a = self.diode.process(b, self.tree.port_resistance(self.top));
        self.tree.set_incident(self.top, a);
        // Output: voltage across the diode pair.
        (a + b) / 2.0
    }

    fn reset(&mut self) {
        self.tree.reset();
    }
}
