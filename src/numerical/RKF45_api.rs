use crate::numerical::common::{ExactFn, REFERENCE_SAMPLES, RhsFn, SolverError, Trajectory};
use log::{debug, info};
use nalgebra::DVector;
use std::time::Instant;

const SAFETY: f64 = 0.9;
const MIN_SCALE: f64 = 0.2;
const MAX_SCALE: f64 = 5.0;
/// Accepted/rejected step attempts allowed inside one call of `_step_impl`.
const MAX_ATTEMPTS: usize = 50;
/// Accepted steps allowed between two neighbouring sample points.
const SEGMENT_STEP_BUDGET: usize = 10_000;

/// Runge-Kutta-Fehlberg 4(5) stepper with embedded error estimate and
/// standard step-size control. One instance walks forward in x; the step
/// never crosses the segment end it is given.
pub struct RKF45 {
    f: RhsFn,
    pub x: f64,
    pub y: f64,
    h: f64,
    rtol: f64,
    atol: f64,
    h_min: f64,
}

impl RKF45 {
    pub fn new(f: RhsFn, x0: f64, y0: f64, h0: f64, rtol: f64, atol: f64, h_min: f64) -> RKF45 {
        RKF45 {
            f,
            x: x0,
            y: y0,
            h: h0,
            rtol,
            atol,
            h_min,
        }
    }

    /// One accepted adaptive step towards x_end. Returns false when the
    /// controller cannot reach the tolerance (step size underflow or a
    /// persistently non-finite state).
    pub fn _step_impl(&mut self, x_end: f64) -> bool {
        // Butcher tableau coefficients for Fehlberg 4(5)
        let a: [[f64; 5]; 5] = [
            [1.0 / 4.0, 0.0, 0.0, 0.0, 0.0],
            [3.0 / 32.0, 9.0 / 32.0, 0.0, 0.0, 0.0],
            [1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0, 0.0, 0.0],
            [
                439.0 / 216.0,
                -8.0,
                3680.0 / 513.0,
                -845.0 / 4104.0,
                0.0,
            ],
            [
                -8.0 / 27.0,
                2.0,
                -3544.0 / 2565.0,
                1859.0 / 4104.0,
                -11.0 / 40.0,
            ],
        ];
        let c = [0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 1.0 / 2.0];
        // 5th order weights
        let b5 = [
            16.0 / 135.0,
            0.0,
            6656.0 / 12825.0,
            28561.0 / 56430.0,
            -9.0 / 50.0,
            2.0 / 55.0,
        ];
        // embedded 4th order weights
        let b4 = [
            25.0 / 216.0,
            0.0,
            1408.0 / 2565.0,
            2197.0 / 4104.0,
            -1.0 / 5.0,
            0.0,
        ];

        let f = &self.f;
        for _ in 0..MAX_ATTEMPTS {
            let h = self.h.min(x_end - self.x);

            let mut k = [0.0_f64; 6];
            k[0] = h * f(self.x, self.y);
            for i in 1..6 {
                let mut y_temp = self.y;
                for j in 0..i {
                    y_temp += a[i - 1][j] * k[j];
                }
                k[i] = h * f(self.x + c[i] * h, y_temp);
            }

            let mut y5 = self.y;
            let mut y4 = self.y;
            for i in 0..6 {
                y5 += b5[i] * k[i];
                y4 += b4[i] * k[i];
            }

            if !y5.is_finite() || !y4.is_finite() {
                self.h = h * 0.5;
                if self.h < self.h_min {
                    return false;
                }
                continue;
            }

            let err = (y5 - y4).abs();
            let tol = self.atol + self.rtol * self.y.abs().max(y5.abs());
            if err <= tol {
                self.x += h;
                self.y = y5;
                let scale = if err > 0.0 {
                    (SAFETY * (tol / err).powf(0.2)).clamp(MIN_SCALE, MAX_SCALE)
                } else {
                    MAX_SCALE
                };
                self.h = (self.h * scale).max(self.h_min);
                return true;
            }
            // rejected: shrink from the attempted step and retry
            let scale = (SAFETY * (tol / err).powf(0.25)).clamp(0.1, 0.9);
            self.h = h * scale;
            if self.h < self.h_min {
                return false;
            }
        }
        false
    }
}

/// High-accuracy reference solve of the same initial value problem,
/// sampled at `REFERENCE_SAMPLES` evenly spaced points over
/// [x0, x_bound]. The sampling grid is decoupled from the fixed-step h.
/// Optionally carries the closed-form exact solution for didactic
/// comparison on the same grid.
pub struct referenceODE {
    f: RhsFn,
    exact: Option<ExactFn>,
    x0: f64,
    y0: f64,
    x_bound: f64,
    n_samples: usize,
    rtol: f64,
    atol: f64,
    status: String,
    message: Option<String>,
    x_result: DVector<f64>,
    y_result: DVector<f64>,
}

impl referenceODE {
    pub fn new(
        f: RhsFn,
        exact: Option<ExactFn>,
        x0: f64,
        y0: f64,
        x_bound: f64,
    ) -> Result<Self, SolverError> {
        if !x0.is_finite() || !x_bound.is_finite() || x_bound <= x0 {
            return Err(SolverError::InvalidConfig(format!(
                "reference span [{}, {}] must be finite and non-empty",
                x0, x_bound
            )));
        }
        if !y0.is_finite() {
            return Err(SolverError::InvalidConfig(format!(
                "initial value y0 = {} must be finite",
                y0
            )));
        }
        Ok(referenceODE {
            f,
            exact,
            x0,
            y0,
            x_bound,
            n_samples: REFERENCE_SAMPLES,
            rtol: 1e-8,
            atol: 1e-10,
            status: "running".to_string(),
            message: None,
            x_result: DVector::zeros(1),
            y_result: DVector::zeros(1),
        })
    }

    pub fn set_tolerance(&mut self, rtol: f64, atol: f64) {
        self.rtol = rtol;
        self.atol = atol;
    }

    fn sample_grid(&self) -> Vec<f64> {
        let span = self.x_bound - self.x0;
        (0..self.n_samples)
            .map(|i| self.x0 + i as f64 * span / (self.n_samples - 1) as f64)
            .collect()
    }

    pub fn solve(&mut self) -> Result<Trajectory, SolverError> {
        let start = Instant::now();
        let span = self.x_bound - self.x0;
        let grid = self.sample_grid();
        let h0 = span / 100.0;
        let h_min = span * 1e-12;
        let mut solver = RKF45::new(
            self.f.clone(),
            self.x0,
            self.y0,
            h0,
            self.rtol,
            self.atol,
            h_min,
        );

        let mut x: Vec<f64> = Vec::with_capacity(self.n_samples);
        let mut y: Vec<f64> = Vec::with_capacity(self.n_samples);
        x.push(self.x0);
        y.push(self.y0);

        for &x_target in grid.iter().skip(1) {
            let mut segment_steps: usize = 0;
            while x_target - solver.x > 1e-14 * span {
                if !solver._step_impl(x_target) {
                    self.status = "failed".to_string();
                    self.message = Some(format!(
                        "step size underflow near x = {}",
                        solver.x
                    ));
                    return Err(SolverError::NonConvergence(format!(
                        "adaptive step size underflow near x = {}",
                        solver.x
                    )));
                }
                segment_steps += 1;
                if segment_steps > SEGMENT_STEP_BUDGET {
                    self.status = "failed".to_string();
                    self.message = Some(format!("step budget exhausted near x = {}", solver.x));
                    return Err(SolverError::NonConvergence(format!(
                        "step budget exhausted near x = {}",
                        solver.x
                    )));
                }
            }
            debug!(
                "reference sample at x = {}: y = {} ({} accepted steps)",
                x_target, solver.y, segment_steps
            );
            x.push(solver.x);
            y.push(solver.y);
        }

        self.status = "finished".to_string();
        let duration = start.elapsed();
        info!(
            "reference solve over [{}, {}] took {} ms",
            self.x0,
            self.x_bound,
            duration.as_millis()
        );
        self.x_result = DVector::from_vec(x.clone());
        self.y_result = DVector::from_vec(y.clone());
        Ok(Trajectory::new(x, y))
    }

    /// Pure evaluation of the configured closed-form solution on the same
    /// sample grid; carries no numerical error of its own.
    pub fn exact_solution(&self) -> Option<Trajectory> {
        let exact = self.exact.as_ref()?;
        let grid = self.sample_grid();
        let y: Vec<f64> = grid.iter().map(|&x| exact(x)).collect();
        Some(Trajectory::new(grid, y))
    }

    pub fn get_result(&self) -> (DVector<f64>, DVector<f64>) {
        (self.x_result.clone(), self.y_result.clone())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_reference {
    use super::*;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    #[test]
    fn test_reference_grid_shape_and_endpoints() {
        let f: RhsFn = Rc::new(|_x, y| -y);
        let mut solver = referenceODE::new(f, None, 0.0, 1.0, 2.0).unwrap();
        let traj = solver.solve().unwrap();
        assert_eq!(traj.len(), REFERENCE_SAMPLES);
        assert_relative_eq!(traj.x[0], 0.0, epsilon = 1e-14);
        assert_relative_eq!(traj.terminal_x(), 2.0, epsilon = 1e-12);
        // grid is evenly spaced
        let step = 2.0 / (REFERENCE_SAMPLES - 1) as f64;
        for i in 0..traj.len() {
            assert_relative_eq!(traj.x[i], i as f64 * step, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_reference_exponential_decay_accuracy() {
        // y' = -y, y(0) = 1, exact y = exp(-x)
        let f: RhsFn = Rc::new(|_x, y| -y);
        let mut solver = referenceODE::new(f, None, 0.0, 1.0, 2.0).unwrap();
        let traj = solver.solve().unwrap();
        for i in 0..traj.len() {
            assert_relative_eq!(traj.y[i], (-traj.x[i]).exp(), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_reference_quadrature_of_cosine() {
        // y' = cos(x), y(0) = 0, exact y = sin(x)
        let f: RhsFn = Rc::new(|x, _y| x.cos());
        let mut solver = referenceODE::new(f, None, 0.0, 0.0, 5.0).unwrap();
        let traj = solver.solve().unwrap();
        for i in 0..traj.len() {
            assert_relative_eq!(traj.y[i], traj.x[i].sin(), epsilon = 1e-7);
        }
    }

    #[test]
    fn test_reference_growth_problem_terminal_value() {
        // y' = x + x*y, y(0) = 0, exact y = exp(x^2/2) - 1
        let f: RhsFn = Rc::new(|x, y| x + x * y);
        let mut solver = referenceODE::new(f, None, 0.0, 0.0, 5.0).unwrap();
        let traj = solver.solve().unwrap();
        let expected = (12.5_f64).exp() - 1.0;
        assert_relative_eq!(traj.terminal_y(), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_reference_blowup_is_a_non_convergence_error() {
        // y' = y^2, y(0) = 1 blows up at x = 1; the solve over [0, 2]
        // must fail loudly, not hand back a degraded trajectory
        let f: RhsFn = Rc::new(|_x, y| y * y);
        let mut solver = referenceODE::new(f, None, 0.0, 1.0, 2.0).unwrap();
        let result = solver.solve();
        assert!(matches!(result, Err(SolverError::NonConvergence(_))));
    }

    #[test]
    fn test_exact_solution_path_is_pure_evaluation() {
        let f: RhsFn = Rc::new(|x, _y| x.cos());
        let exact: ExactFn = Rc::new(|x: f64| x.sin());
        let solver = referenceODE::new(f, Some(exact), 0.0, 0.0, 5.0).unwrap();
        // available without running the numerical solve
        let traj = solver.exact_solution().unwrap();
        assert_eq!(traj.len(), REFERENCE_SAMPLES);
        for i in 0..traj.len() {
            assert_eq!(traj.y[i], traj.x[i].sin());
        }
    }

    #[test]
    fn test_exact_solution_absent_when_not_configured() {
        let f: RhsFn = Rc::new(|x, _y| x);
        let solver = referenceODE::new(f, None, 0.0, 0.0, 5.0).unwrap();
        assert!(solver.exact_solution().is_none());
    }

    #[test]
    fn test_reference_rejects_empty_span() {
        let f: RhsFn = Rc::new(|x, _y| x);
        assert!(matches!(
            referenceODE::new(f, None, 5.0, 0.0, 5.0),
            Err(SolverError::InvalidConfig(_))
        ));
    }
}
