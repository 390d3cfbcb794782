//! R-type root adaptor: an N-port junction whose scattering relation is
//! a dense matrix over the current leg impedances.
//!
//! Used for sub-circuits that do not decompose into series/parallel
//! pairs — op-amp stages, bridged tone networks. The matrix `S` is a
//! closed-form function of the leg port impedances and fixed device
//! constants, derived per topology by an offline symbolic solver; the
//! runtime only re-evaluates it when an impedance changes. Per sample
//! the root's entire cost is one matrix-vector product, `b = S·a`.

use crate::tree::{NodeId, TreeError, WdfTree};

/// Closed-form scattering matrix for one fixed topology.
///
/// `evaluate` is called only from impedance propagation (never per
/// sample) with the current leg port resistances. Implementations are
/// pure: the same `r` must always produce the same `s`.
pub trait ScatteringMatrix<const N: usize> {
    fn evaluate(&self, r: &[f64; N], s: &mut [[f64; N]; N]);
}

impl<const N: usize, F: Fn(&[f64; N], &mut [[f64; N]; N])> ScatteringMatrix<N> for F {
    fn evaluate(&self, r: &[f64; N], s: &mut [[f64; N]; N]) {
        self(r, s);
    }
}

/// N-leg root adaptor. Each leg is an adapted subtree in a [`WdfTree`];
/// the root itself has no parent port.
///
/// `S` is valid only for the leg impedances it was computed from: any
/// change to a leg invalidates it until [`RootAdaptor::propagate`] runs.
#[derive(Debug, Clone)]
pub struct RootAdaptor<const N: usize, M> {
    legs: [NodeId; N],
    matrix: M,
    r: [f64; N],
    s: [[f64; N]; N],
    a: [f64; N],
    b: [f64; N],
}

impl<const N: usize, M: ScatteringMatrix<N>> RootAdaptor<N, M> {
    /// Build the root over its legs and evaluate the initial matrix.
    ///
    /// Legs must be distinct subtree roots of `tree`.
    pub fn new(tree: &WdfTree, legs: [NodeId; N], matrix: M) -> Result<Self, TreeError> {
        for (i, leg) in legs.iter().enumerate() {
            if legs[..i].contains(leg) {
                return Err(TreeError::DuplicateChild);
            }
            if tree.is_attached(*leg) {
                return Err(TreeError::ChildAlreadyAttached);
            }
        }
        let mut root = Self {
            legs,
            matrix,
            r: [0.0; N],
            s: [[0.0; N]; N],
            a: [0.0; N],
            b: [0.0; N],
        };
        root.rebuild(tree);
        Ok(root)
    }

    fn rebuild(&mut self, tree: &WdfTree) {
        for (ri, leg) in self.r.iter_mut().zip(self.legs.iter()) {
            *ri = tree.port_resistance(*leg);
        }
        self.matrix.evaluate(&self.r, &mut self.s);
    }

    /// Recompute leg impedances bottom-up, then rebuild `S` once.
    /// Called by the propagation scope after element-value changes.
    pub fn propagate(&mut self, tree: &mut WdfTree) {
        for leg in self.legs {
            tree.recompute_impedances(leg);
        }
        self.rebuild(tree);
    }

    /// One sample: gather leg reflected waves, scatter through `S`,
    /// distribute incident waves back down. Allocation-free.
    #[inline]
    pub fn compute(&mut self, tree: &mut WdfTree) {
        for (ak, leg) in self.a.iter_mut().zip(self.legs.iter()) {
            *ak = tree.reflected(*leg);
        }
        for (bi, row) in self.b.iter_mut().zip(self.s.iter()) {
            let mut acc = 0.0;
            for (sij, aj) in row.iter().zip(self.a.iter()) {
                acc += sij * aj;
            }
            *bi = acc;
        }
        for (bk, leg) in self.b.iter().zip(self.legs.iter()) {
            tree.set_incident(*leg, *bk);
        }
    }

    /// Current scattering matrix (for inspection/tests).
    pub fn scattering(&self) -> &[[f64; N]; N] {
        &self.s
    }

    /// Leg impedances the current matrix was computed from.
    pub fn leg_impedances(&self) -> &[f64; N] {
        &self.r
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
