use nalgebra::DVector;
use std::fmt;
use std::rc::Rc;

/// Right-hand side f(x, y) of the scalar ODE dy/dx = f(x, y). Must be pure:
/// no side effects, evaluable at any point the integrators request,
/// including off-grid half-step points.
pub type RhsFn = Rc<dyn Fn(f64, f64) -> f64>;

/// Closed-form solution y(x), when one is known for the problem.
pub type ExactFn = Rc<dyn Fn(f64) -> f64>;

/// Number of evenly spaced sample points of the reference trajectory,
/// decoupled from the fixed-step grid.
pub const REFERENCE_SAMPLES: usize = 50;

/// One integrator run: sample pairs (x[i], y[i]), index 0 is the initial
/// condition. Immutable after creation, superseded wholesale on recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub x: DVector<f64>,
    pub y: DVector<f64>,
}

impl Trajectory {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Trajectory {
        assert_eq!(x.len(), y.len(), "x and y sample counts must agree");
        Trajectory {
            x: DVector::from_vec(x),
            y: DVector::from_vec(y),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn terminal_x(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    pub fn terminal_y(&self) -> f64 {
        self.y[self.y.len() - 1]
    }
}

/// Failure taxonomy of the solver core. No retries, no fallback
/// approximation: every failure is surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Non-positive or non-finite step size, empty span, zero step count.
    /// Rejected before any integrator runs.
    InvalidConfig(String),
    /// The derivative produced a non-finite value at a required point.
    NumericFailure(String),
    /// The adaptive reference solve could not reach its tolerance.
    NonConvergence(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            SolverError::NumericFailure(msg) => write!(f, "numeric evaluation failure: {}", msg),
            SolverError::NonConvergence(msg) => write!(f, "reference solver did not converge: {}", msg),
        }
    }
}

impl std::error::Error for SolverError {}

/// Number of fixed steps of size h needed to cover [x0, x1],
/// n = round((x1 - x0)/h). A meaningful trajectory needs n >= 1.
pub fn steps_for_span(x0: f64, x1: f64, h: f64) -> Result<usize, SolverError> {
    if !h.is_finite() || h <= 0.0 {
        return Err(SolverError::InvalidConfig(format!(
            "step size h = {} must be positive and finite",
            h
        )));
    }
    if !x0.is_finite() || !x1.is_finite() || x1 <= x0 {
        return Err(SolverError::InvalidConfig(format!(
            "span [{}, {}] must be finite and non-empty",
            x0, x1
        )));
    }
    let n = ((x1 - x0) / h).round() as usize;
    if n < 1 {
        return Err(SolverError::InvalidConfig(format!(
            "step size h = {} gives zero steps over [{}, {}]",
            h, x0, x1
        )));
    }
    Ok(n)
}
