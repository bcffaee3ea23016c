/// a collection of initial value problems with known closed-form
/// solutions, for demos and for testing the integrators
use crate::numerical::common::{ExactFn, RhsFn};
use std::rc::Rc;
use strum_macros::EnumIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ODETestProblem {
    /// y' = x, solution y = y0 + (x^2 - x0^2)/2
    Parabola,
    /// y' = x + x*y; separable, 1 + y = (1 + y0)*exp((x^2 - x0^2)/2)
    GaussianGrowth,
    /// y' = -y, solution y = y0*exp(-(x - x0))
    ExpDecay,
    /// y' = 0, solution y = y0
    Flat,
}

impl ODETestProblem {
    pub fn name(&self) -> &'static str {
        match self {
            ODETestProblem::Parabola => "y' = x",
            ODETestProblem::GaussianGrowth => "y' = x + x*y",
            ODETestProblem::ExpDecay => "y' = -y",
            ODETestProblem::Flat => "y' = 0",
        }
    }

    pub fn rhs(&self) -> RhsFn {
        match self {
            ODETestProblem::Parabola => Rc::new(|x, _y| x),
            ODETestProblem::GaussianGrowth => Rc::new(|x, y| x + x * y),
            ODETestProblem::ExpDecay => Rc::new(|_x, y| -y),
            ODETestProblem::Flat => Rc::new(|_x, _y| 0.0),
        }
    }

    /// Closed-form solution through (x0, y0).
    pub fn exact_solution(&self, x0: f64, y0: f64) -> ExactFn {
        match self {
            ODETestProblem::Parabola => Rc::new(move |x| y0 + (x * x - x0 * x0) / 2.0),
            ODETestProblem::GaussianGrowth => {
                Rc::new(move |x| (1.0 + y0) * ((x * x - x0 * x0) / 2.0).exp() - 1.0)
            }
            ODETestProblem::ExpDecay => Rc::new(move |x| y0 * (-(x - x0)).exp()),
            ODETestProblem::Flat => Rc::new(move |_x| y0),
        }
    }
}
