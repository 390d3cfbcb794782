//! Scoped, deferred impedance propagation.
//!
//! Element-value changes (pot positions, cutoff-derived resistances,
//! sample-rate changes) invalidate every adaptor coefficient on the
//! path to the root and the root's scattering matrix. Recomputing per
//! mutation would redo the same bottom-up walk once per knob; instead,
//! all mutations in one parameter update are collected inside a
//! [`PropagationScope`], and the single recompute runs when the scope
//! drops — on every exit path. A scope that changed nothing recomputes
//! to bit-identical values, so closing one is always safe.

use crate::rtype::{RootAdaptor, ScatteringMatrix};
use crate::tree::{NodeId, WdfTree};

/// The top of a circuit for propagation purposes: whatever must be
/// refreshed, exactly once, after a batch of element-value mutations.
pub trait PropagationRoot {
    fn propagate(&mut self, tree: &mut WdfTree);
}

/// A subtree root feeding a nonlinear element (diode clipper-style
/// circuits): propagation is just the bottom-up impedance recompute.
#[derive(Debug, Clone, Copy)]
pub struct SubtreeRoot(pub NodeId);

impl PropagationRoot for SubtreeRoot {
    fn propagate(&mut self, tree: &mut WdfTree) {
        tree.recompute_impedances(self.0);
    }
}

impl<const N: usize, M: ScatteringMatrix<N>> PropagationRoot for RootAdaptor<N, M> {
    fn propagate(&mut self, tree: &mut WdfTree) {
        RootAdaptor::propagate(self, tree);
    }
}

/// Transaction guard for a batch of impedance-affecting mutations.
///
/// Mutations write element values immediately; derived state (adaptor
/// coefficients, the root matrix) is rebuilt once, in [`Drop`]. Open a
/// scope around every parameter update, including sample-rate changes.
pub struct PropagationScope<'a, R: PropagationRoot> {
    tree: &'a mut WdfTree,
    root: &'a mut R,
}

impl<'a, R: PropagationRoot> PropagationScope<'a, R> {
    pub fn new(tree: &'a mut WdfTree, root: &'a mut R) -> Self {
        Self { tree, root }
    }

    /// Set a resistive element's value (Ω). Deferred like all mutations.
    pub fn set_resistance(&mut self, id: NodeId, ohms: f64) {
        self.tree.set_resistance(id, ohms);
    }

    /// Set a capacitor's value (F).
    pub fn set_capacitance(&mut self, id: NodeId, farads: f64) {
        self.tree.set_capacitance(id, farads);
    }

    /// Re-derive capacitor impedances for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.tree.set_sample_rate(sample_rate);
    }
}

impl<R: PropagationRoot> Drop for PropagationScope<'_, R> {
    fn drop(&mut self) {
        self.root.propagate(self.tree);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
