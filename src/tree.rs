//! WDF tree: leaves and adaptors in an arena, plus the per-sample
//! scatter passes.
//!
//! The tree processes audio one sample at a time in four phases:
//! 1. **reflected** — bottom-up: leaves produce reflected waves `b`,
//!    adaptors combine them.
//! 2. **root solve** — the root element (nonlinear diode or R-type
//!    adaptor) produces incident waves back down.
//! 3. **set_incident** — top-down: adaptors redistribute incident waves
//!    to children.
//! 4. state update — reactive leaves latch their incident wave during
//!    the downward pass, completing the unit delay.
//!
//! Nodes are a closed tagged-variant set stored in an arena with index
//! children, so circuits of any topology share one node type instead of
//! a nested generic type per combination. Zero allocation on the hot
//! path — the arena is sized at construction.
//!
//! Adaptor algebra (port 3 = parent, reflection-free):
//! - Series: `Rp = R1 + R2`, `γ = R1/Rp`
//!   up `b3 = -(b1 + b2)`; down `a1 = b1 - γ(b1 + b2 + a3)`,
//!   `a2 = b2 - (1-γ)(b1 + b2 + a3)`
//! - Parallel: `Rp = R1 R2/(R1 + R2)`, `γ = R2/(R1 + R2)` (= G1/G3)
//!   up `b3 = γ b1 + (1-γ) b2`; down `a1 = a3 + (1-γ)(b2 - b1)`,
//!   `a2 = a3 - γ(b2 - b1)`

use thiserror::Error;

/// Construction-time topology errors. There is no recoverable failure
/// at runtime — a tree that builds is a tree that runs.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("component value must be positive and finite, got {0}")]
    InvalidComponentValue(f64),
    #[error("node is already attached to an adaptor")]
    ChildAlreadyAttached,
    #[error("adaptor children must be distinct nodes")]
    DuplicateChild,
}

/// Index of a node in a [`WdfTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// One node of the WDF tree. Leaves carry their electrical state;
/// adaptors carry their scattering coefficients and cached child waves.
#[derive(Debug, Clone, Copy)]
enum WdfNode {
    Resistor {
        resistance: f64,
        a: f64,
    },
    Capacitor {
        capacitance: f64,
        rp: f64,
        /// z⁻¹ of the incident wave.
        state: f64,
        a: f64,
        b: f64,
    },
    ResistiveSource {
        resistance: f64,
        voltage: f64,
        a: f64,
    },
    Series {
        left: NodeId,
        right: NodeId,
        rp: f64,
        gamma: f64,
        b1: f64,
        b2: f64,
        a: f64,
        b: f64,
    },
    Parallel {
        left: NodeId,
        right: NodeId,
        rp: f64,
        gamma: f64,
        b1: f64,
        b2: f64,
        a: f64,
        b: f64,
    },
}

/// Arena of WDF nodes forming one or more trees.
///
/// Children are created before their parents and an adaptor may claim a
/// node only once, so the structure is acyclic by construction; a
/// dangling or doubly-attached child is rejected when the adaptor is
/// built, before any audio flows.
#[derive(Debug, Clone)]
pub struct WdfTree {
    nodes: Vec<WdfNode>,
    attached: Vec<bool>,
    sample_rate: f64,
}

impl WdfTree {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            nodes: Vec::new(),
            attached: Vec::new(),
            sample_rate,
        }
    }

    fn push(&mut self, node: WdfNode) -> NodeId {
        self.nodes.push(node);
        self.attached.push(false);
        NodeId(self.nodes.len() - 1)
    }

    fn check_value(value: f64) -> Result<f64, TreeError> {
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(TreeError::InvalidComponentValue(value))
        }
    }

    pub fn resistor(&mut self, ohms: f64) -> Result<NodeId, TreeError> {
        let resistance = Self::check_value(ohms)?;
        Ok(self.push(WdfNode::Resistor { resistance, a: 0.0 }))
    }

    pub fn capacitor(&mut self, farads: f64) -> Result<NodeId, TreeError> {
        let capacitance = Self::check_value(farads)?;
        Ok(self.push(WdfNode::Capacitor {
            capacitance,
            rp: 1.0 / (2.0 * self.sample_rate * capacitance),
            state: 0.0,
            a: 0.0,
            b: 0.0,
        }))
    }

    pub fn resistive_source(&mut self, series_ohms: f64) -> Result<NodeId, TreeError> {
        let resistance = Self::check_value(series_ohms)?;
        Ok(self.push(WdfNode::ResistiveSource {
            resistance,
            voltage: 0.0,
            a: 0.0,
        }))
    }

    fn claim(&mut self, left: NodeId, right: NodeId) -> Result<(), TreeError> {
        if left == right {
            return Err(TreeError::DuplicateChild);
        }
        if self.attached[left.0] || self.attached[right.0] {
            return Err(TreeError::ChildAlreadyAttached);
        }
        self.attached[left.0] = true;
        self.attached[right.0] = true;
        Ok(())
    }

    pub fn series(&mut self, left: NodeId, right: NodeId) -> Result<NodeId, TreeError> {
        self.claim(left, right)?;
        let r1 = self.port_resistance(left);
        let r2 = self.port_resistance(right);
        Ok(self.push(WdfNode::Series {
            left,
            right,
            rp: r1 + r2,
            gamma: r1 / (r1 + r2),
            b1: 0.0,
            b2: 0.0,
            a: 0.0,
            b: 0.0,
        }))
    }

    pub fn parallel(&mut self, left: NodeId, right: NodeId) -> Result<NodeId, TreeError> {
        self.claim(left, right)?;
        let r1 = self.port_resistance(left);
        let r2 = self.port_resistance(right);
        Ok(self.push(WdfNode::Parallel {
            left,
            right,
            rp: r1 * r2 / (r1 + r2),
            gamma: r2 / (r1 + r2),
            b1: 0.0,
            b2: 0.0,
            a: 0.0,
            b: 0.0,
        }))
    }

    pub(crate) fn is_attached(&self, id: NodeId) -> bool {
        self.attached[id.0]
    }

    /// Port resistance looking into `id`.
    pub fn port_resistance(&self, id: NodeId) -> f64 {
        match self.nodes[id.0] {
            WdfNode::Resistor { resistance, .. }
            | WdfNode::ResistiveSource { resistance, .. } => resistance,
            WdfNode::Capacitor { rp, .. }
            | WdfNode::Series { rp, .. }
            | WdfNode::Parallel { rp, .. } => rp,
        }
    }

    /// Bottom-up pass: compute the reflected wave of the subtree at `id`,
    /// caching child waves in each adaptor for the downward pass.
    pub fn reflected(&mut self, id: NodeId) -> f64 {
        let node = self.nodes[id.0];
        match node {
            WdfNode::Resistor { .. } => 0.0,
            WdfNode::Capacitor { state, .. } => {
                if let WdfNode::Capacitor { b, .. } = &mut self.nodes[id.0] {
                    *b = state;
                }
                state
            }
            WdfNode::ResistiveSource { voltage, .. } => voltage,
            WdfNode::Series { left, right, .. } => {
                let b1 = self.reflected(left);
                let b2 = self.reflected(right);
                let out = -(b1 + b2);
                if let WdfNode::Series { b1: c1, b2: c2, b, .. } = &mut self.nodes[id.0] {
                    *c1 = b1;
                    *c2 = b2;
                    *b = out;
                }
                out
            }
            WdfNode::Parallel { left, right, gamma, .. } => {
                let b1 = self.reflected(left);
                let b2 = self.reflected(right);
                let out = gamma * b1 + (1.0 - gamma) * b2;
                if let WdfNode::Parallel { b1: c1, b2: c2, b, .. } = &mut self.nodes[id.0] {
                    *c1 = b1;
                    *c2 = b2;
                    *b = out;
                }
                out
            }
        }
    }

    /// Top-down pass: deliver the incident wave to the subtree at `id`.
    /// Reactive leaves latch their state here.
    pub fn set_incident(&mut self, id: NodeId, a: f64) {
        let node = self.nodes[id.0];
        match node {
            WdfNode::Resistor { .. } => {
                if let WdfNode::Resistor { a: slot, .. } = &mut self.nodes[id.0] {
                    *slot = a;
                }
            }
            WdfNode::Capacitor { .. } => {
                if let WdfNode::Capacitor { a: slot, state, .. } = &mut self.nodes[id.0] {
                    *slot = a;
                    *state = a;
                }
            }
            WdfNode::ResistiveSource { .. } => {
                if let WdfNode::ResistiveSource { a: slot, .. } = &mut self.nodes[id.0] {
                    *slot = a;
                }
            }
            WdfNode::Series {
                left,
                right,
                gamma,
                b1,
                b2,
                ..
            } => {
                if let WdfNode::Series { a: slot, .. } = &mut self.nodes[id.0] {
                    *slot = a;
                }
                let sum = b1 + b2 + a;
                self.set_incident(left, b1 - gamma * sum);
                self.set_incident(right, b2 - (1.0 - gamma) * sum);
            }
            WdfNode::Parallel {
                left,
                right,
                gamma,
                b1,
                b2,
                ..
            } => {
                if let WdfNode::Parallel { a: slot, .. } = &mut self.nodes[id.0] {
                    *slot = a;
                }
                let diff = b2 - b1;
                self.set_incident(left, a + (1.0 - gamma) * diff);
                self.set_incident(right, a - gamma * diff);
            }
        }
    }

    /// Recompute adaptor port resistances and scattering coefficients
    /// bottom-up after element values changed. Called by the propagation
    /// scope, never per sample.
    pub fn recompute_impedances(&mut self, id: NodeId) {
        let node = self.nodes[id.0];
        match node {
            WdfNode::Series { left, right, .. } => {
                self.recompute_impedances(left);
                self.recompute_impedances(right);
                let r1 = self.port_resistance(left);
                let r2 = self.port_resistance(right);
                if let WdfNode::Series { rp, gamma, .. } = &mut self.nodes[id.0] {
                    *rp = r1 + r2;
                    *gamma = r1 / (r1 + r2);
                }
            }
            WdfNode::Parallel { left, right, .. } => {
                self.recompute_impedances(left);
                self.recompute_impedances(right);
                let r1 = self.port_resistance(left);
                let r2 = self.port_resistance(right);
                if let WdfNode::Parallel { rp, gamma, .. } = &mut self.nodes[id.0] {
                    *rp = r1 * r2 / (r1 + r2);
                    *gamma = r2 / (r1 + r2);
                }
            }
            _ => {}
        }
    }

    /// Update capacitor port resistances for a new sample rate. Adaptor
    /// coefficients are stale afterwards until a propagation pass runs.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        for node in &mut self.nodes {
            if let WdfNode::Capacitor { capacitance, rp, .. } = node {
                *rp = 1.0 / (2.0 * sample_rate * *capacitance);
            }
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Set a resistor's value. Takes effect on the next propagation pass.
    pub fn set_resistance(&mut self, id: NodeId, ohms: f64) {
        match &mut self.nodes[id.0] {
            WdfNode::Resistor { resistance, .. }
            | WdfNode::ResistiveSource { resistance, .. } => *resistance = ohms,
            _ => debug_assert!(false, "set_resistance on a non-resistive node"),
        }
    }

    /// Set a capacitor's value. Takes effect on the next propagation pass.
    pub fn set_capacitance(&mut self, id: NodeId, farads: f64) {
        let fs = self.sample_rate;
        match &mut self.nodes[id.0] {
            WdfNode::Capacitor { capacitance, rp, .. } => {
                *capacitance = farads;
                *rp = 1.0 / (2.0 * fs * farads);
            }
            _ => debug_assert!(false, "set_capacitance on a non-capacitor node"),
        }
    }

    /// Set a source's instantaneous voltage (per-sample signal injection).
    pub fn set_source_voltage(&mut self, id: NodeId, volts: f64) {
        match &mut self.nodes[id.0] {
            WdfNode::ResistiveSource { voltage, .. } => *voltage = volts,
            _ => debug_assert!(false, "set_source_voltage on a non-source node"),
        }
    }

    /// Voltage at a node's port after the downward pass: `(a + b) / 2`.
    /// The sign follows the port's orientation in its junction; output
    /// taps apply a fixed per-circuit polarity.
    pub fn voltage(&self, id: NodeId) -> f64 {
        match self.nodes[id.0] {
            WdfNode::Resistor { a, .. } => a / 2.0,
            WdfNode::Capacitor { a, b, .. } => (a + b) / 2.0,
            WdfNode::ResistiveSource { a, voltage, .. } => (a + voltage) / 2.0,
            WdfNode::Series { a, b, .. } | WdfNode::Parallel { a, b, .. } => (a + b) / 2.0,
        }
    }

    /// Zero all wave state (capacitor memory, cached adaptor waves).
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            match node {
                WdfNode::Resistor { a, .. } => *a = 0.0,
                WdfNode::Capacitor { state, a, b, .. } => {
                    *state = 0.0;
                    *a = 0.0;
                    *b = 0.0;
                }
                WdfNode::ResistiveSource { a, .. } => *a = 0.0,
                WdfNode::Series { b1, b2, a, b, .. }
                | WdfNode::Parallel { b1, b2, a, b, .. } => {
                    *b1 = 0.0;
                    *b2 = 0.0;
                    *a = 0.0;
                    *b = 0.0;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{IdealVoltageSourceRoot, WdfRoot};

    #[test]
    fn series_port_resistance() {
        let mut t = WdfTree::new(48000.0);
        let r1 = t.resistor(1000.0).unwrap();
        let r2 = t.resistor(2000.0).unwrap();
        let s = t.series(r1, r2).unwrap();
        assert!((t.port_resistance(s) - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn parallel_port_resistance() {
        let mut t = WdfTree::new(48000.0);
        let r1 = t.resistor(1000.0).unwrap();
        let r2 = t.resistor(2000.0).unwrap();
        let p = t.parallel(r1, r2).unwrap();
        assert!((t.port_resistance(p) - 1000.0 * 2000.0 / 3000.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_component_values_rejected() {
        let mut t = WdfTree::new(48000.0);
        assert_eq!(t.resistor(0.0), Err(TreeError::InvalidComponentValue(0.0)));
        assert_eq!(t.resistor(-5.0), Err(TreeError::InvalidComponentValue(-5.0)));
        assert!(t.capacitor(f64::INFINITY).is_err());
        assert!(t.capacitor(f64::NAN).is_err());
    }

    #[test]
    fn double_attachment_rejected() {
        let mut t = WdfTree::new(48000.0);
        let r1 = t.resistor(1000.0).unwrap();
        let r2 = t.resistor(2000.0).unwrap();
        let r3 = t.resistor(3000.0).unwrap();
        let _s = t.series(r1, r2).unwrap();
        assert_eq!(t.series(r1, r3), Err(TreeError::ChildAlreadyAttached));
        assert_eq!(t.parallel(r3, r3), Err(TreeError::DuplicateChild));
    }

    #[test]
    fn resistive_divider_matches_analytic_ratio() {
        // Ideal source at the root over Series(R1, R2). The series
        // junction orients ports so that v1 + v2 + v3 = 0; the tap across
        // R2 therefore reads -Vs * R2/(R1+R2).
        for (r1, r2) in [(1000.0, 1000.0), (4700.0, 10_000.0), (220.0, 100_000.0)] {
            let mut t = WdfTree::new(48000.0);
            let ra = t.resistor(r1).unwrap();
            let rb = t.resistor(r2).unwrap();
            let s = t.series(ra, rb).unwrap();
            let mut source = IdealVoltageSourceRoot::new();
            source.set_voltage(1.0);

            let b = t.reflected(s);
            let a = source.process(b, t.port_resistance(s));
            t.set_incident(s, a);

            let expected = r2 / (r1 + r2);
            let tap = -t.voltage(rb);
            assert!(
                (tap - expected).abs() < 1e-12,
                "divider {r1}/{r2}: got {tap}, expected {expected}"
            );
        }
    }

    #[test]
    fn parallel_junction_voltage_is_shared() {
        // Ideal source over Parallel(R1, R2): both children and the
        // junction see the source voltage.
        let mut t = WdfTree::new(48000.0);
        let r1 = t.resistor(4700.0).unwrap();
        let r2 = t.resistor(47_000.0).unwrap();
        let p = t.parallel(r1, r2).unwrap();
        let mut source = IdealVoltageSourceRoot::new();
        source.set_voltage(1.0);

        let b = t.reflected(p);
        let a = source.process(b, t.port_resistance(p));
        t.set_incident(p, a);

        assert!((t.voltage(p) - 1.0).abs() < 1e-12);
        assert!((t.voltage(r1) - 1.0).abs() < 1e-12);
        assert!((t.voltage(r2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rc_lowpass_tracks_bilinear_response() {
        // Series(R, C) driven by an ideal source; tap across C is a
        // first-order low-pass whose magnitude matches the analytic
        // response at the prewarped analog frequency.
        let fs = 48000.0;
        let (r, c) = (1000.0, 100e-9);
        for freq in [100.0, 1591.5, 10_000.0] {
            let mut t = WdfTree::new(fs);
            let res = t.resistor(r).unwrap();
            let cap = t.capacitor(c).unwrap();
            let s = t.series(res, cap).unwrap();
            let mut source = IdealVoltageSourceRoot::new();

            let n = fs as usize;
            let mut in_energy = 0.0;
            let mut out_energy = 0.0;
            for i in 0..n {
                let x = (2.0 * std::f64::consts::PI * freq * i as f64 / fs).sin();
                source.set_voltage(x);
                let b = t.reflected(s);
                let a = source.process(b, t.port_resistance(s));
                t.set_incident(s, a);
                let y = -t.voltage(cap);
                if i > n / 2 {
                    in_energy += x * x;
                    out_energy += y * y;
                }
            }
            let gain = (out_energy / in_energy).sqrt();
            let wa = 2.0 * fs * (std::f64::consts::PI * freq / fs).tan();
            let expected = 1.0 / (1.0 + (wa * r * c).powi(2)).sqrt();
            assert!(
                (gain - expected).abs() < 0.01,
                "f={freq}: gain={gain:.4}, analytic={expected:.4}"
            );
        }
    }

    #[test]
    fn recompute_reaches_nested_adaptors() {
        let mut t = WdfTree::new(48000.0);
        let pot = t.resistor(50_000.0).unwrap();
        let cap = t.capacitor(22e-9).unwrap();
        let inner = t.parallel(pot, cap).unwrap();
        let outer_r = t.resistor(10_000.0).unwrap();
        let outer = t.series(outer_r, inner).unwrap();

        let before = t.port_resistance(outer);
        t.set_resistance(pot, 1000.0);
        t.recompute_impedances(outer);
        let after = t.port_resistance(outer);
        assert!(after < before, "nested pot change must propagate: {before} -> {after}");

        // And it must be idempotent.
        t.recompute_impedances(outer);
        assert_eq!(after.to_bits(), t.port_resistance(outer).to_bits());
    }

    #[test]
    fn reset_clears_capacitor_memory() {
        let mut t = WdfTree::new(48000.0);
        let cap = t.capacitor(100e-9).unwrap();
        t.set_incident(cap, 0.7);
        assert_eq!(t.reflected(cap), 0.7);
        t.reset();
        assert_eq!(t.reflected(cap), 0.0);
    }
}
