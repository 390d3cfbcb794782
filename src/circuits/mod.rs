//! Ready-to-use circuit processors built on the WDF engine.
//!
//! Each circuit owns a fixed topology built once at construction; only
//! element values change afterwards, always inside a propagation scope.
//! Parameter setters take normalized 0–1 knob positions and map them to
//! physical quantities here, clamping at this boundary so the engine
//! below never sees a degenerate value.

mod baxandall;
mod clipper;
mod rectifier;
mod screamer_tone;

pub use baxandall::{Baxandall, BaxandallParams};
pub use clipper::{ClipperParams, DiodeClipper};
pub use rectifier::{DiodeRectifier, RectifierParams};
pub use screamer_tone::{ScreamerTone, ScreamerToneParams};

/// Clamp a normalized knob position to the open interval that keeps pot
/// halves strictly positive.
pub(crate) fn clamp_pot(position: f64) -> f64 {
    position.clamp(0.01, 0.99)
}

/// Clamp a normalized control to [0, 1].
pub(crate) fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
