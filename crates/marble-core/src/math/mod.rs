// SPDX-License-Identifier: Apache-2.0
//! Deterministic fixed-point numerics.

mod fixed;
mod trig;

pub use fixed::Fixed;
pub use trig::Slope;
