//! Velocity-solver selection.

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use swell_core::{DiscreteFunction3, Real, SwellResult};

use crate::high_amplitude::HighAmplitudeSolver;
use crate::linear::LinearSolver;
use crate::plain::PlainWaveSolver;

/// The velocity-potential solver kinds selectable from the configuration.
///
/// `small_amplitude` in a configuration file is an alias for the linear
/// kernel, which is the small-amplitude theory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VelocityPotentialSolver {
    Linear(LinearSolver),
    HighAmplitude(HighAmplitudeSolver),
    Plain(PlainWaveSolver),
}

impl VelocityPotentialSolver {
    pub fn name(&self) -> &'static str {
        match self {
            VelocityPotentialSolver::Linear(_) => "linear",
            VelocityPotentialSolver::HighAmplitude(_) => "high_amplitude",
            VelocityPotentialSolver::Plain(_) => "plain",
        }
    }

    /// Compute `φ(t, z, x, y)` from the surface elevation.
    pub fn solve(&self, zeta: &DiscreteFunction3) -> SwellResult<Array4<Real>> {
        match self {
            VelocityPotentialSolver::Linear(solver) => solver.solve(zeta),
            VelocityPotentialSolver::HighAmplitude(solver) => solver.solve(zeta),
            VelocityPotentialSolver::Plain(solver) => solver.solve(zeta),
        }
    }
}
