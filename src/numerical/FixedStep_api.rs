use crate::numerical::common::{RhsFn, SolverError, Trajectory};
use log::debug;
use nalgebra::DVector;
use std::rc::Rc;
use strum_macros::EnumIter;

/// The three explicit fixed-step one-step methods under study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Method {
    Euler,
    RK2,
    RK4,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Euler => "Euler",
            Method::RK2 => "RK2",
            Method::RK4 => "RK4",
        }
    }
    /// Global order of accuracy p: terminal error scales as O(h^p).
    pub fn order(&self) -> usize {
        match self {
            Method::Euler => 1,
            Method::RK2 => 2,
            Method::RK4 => 4,
        }
    }
}

pub enum Solvers {
    Euler(Euler),
    RK2(RK2),
    RK4(RK4),
}

impl Solvers {
    pub fn new(method: Method) -> Solvers {
        match method {
            Method::Euler => Solvers::Euler(Euler::new()),
            Method::RK2 => Solvers::RK2(RK2::new()),
            Method::RK4 => Solvers::RK4(RK4::new()),
        }
    }
    pub fn set_initial(&mut self, f: RhsFn, x0: f64, y0: f64, h: f64) {
        match self {
            Solvers::Euler(euler) => euler.set_initial(f, x0, y0, h),
            Solvers::RK2(rk2) => rk2.set_initial(f, x0, y0, h),
            Solvers::RK4(rk4) => rk4.set_initial(f, x0, y0, h),
        }
    }
}

trait Solver {
    fn step(
        &mut self,
        n_steps: usize,
        step_count: &mut usize,
        status: &mut String,
        message: &mut Option<String>,
    );
}

impl Solver for Euler {
    fn step(
        &mut self,
        n_steps: usize,
        step_count: &mut usize,
        status: &mut String,
        message: &mut Option<String>,
    ) {
        if *step_count >= n_steps {
            *status = "finished".to_string();
        } else {
            let success = self._step_impl();

            if !success {
                *message = Some(format!("non-finite derivative value near x = {}", self.x));
                *status = "failed".to_string();
            } else {
                *step_count += 1;
                *status = "running".to_string();
                if *step_count >= n_steps {
                    *status = "finished".to_string();
                }
            }
        }
    }
}

impl Solver for RK2 {
    fn step(
        &mut self,
        n_steps: usize,
        step_count: &mut usize,
        status: &mut String,
        message: &mut Option<String>,
    ) {
        if *step_count >= n_steps {
            *status = "finished".to_string();
        } else {
            let success = self._step_impl();

            if !success {
                *message = Some(format!("non-finite derivative value near x = {}", self.x));
                *status = "failed".to_string();
            } else {
                *step_count += 1;
                *status = "running".to_string();
                if *step_count >= n_steps {
                    *status = "finished".to_string();
                }
            }
        }
    }
}

impl Solver for RK4 {
    fn step(
        &mut self,
        n_steps: usize,
        step_count: &mut usize,
        status: &mut String,
        message: &mut Option<String>,
    ) {
        if *step_count >= n_steps {
            *status = "finished".to_string();
        } else {
            let success = self._step_impl();

            if !success {
                *message = Some(format!("non-finite derivative value near x = {}", self.x));
                *status = "failed".to_string();
            } else {
                *step_count += 1;
                *status = "running".to_string();
                if *step_count >= n_steps {
                    *status = "finished".to_string();
                }
            }
        }
    }
}

/// Fixed-step solver facade: runs one method over n steps of size h and
/// collects the trajectory, initial condition included.
pub struct fixedstepODE {
    method: Method,
    x0: f64,
    y0: f64,
    h: f64,
    n_steps: usize,
    solver_instance: Solvers,
    status: String,
    message: Option<String>,
    x_result: DVector<f64>,
    y_result: DVector<f64>,
}

impl fixedstepODE {
    pub fn new(
        method: Method,
        f: RhsFn,
        x0: f64,
        y0: f64,
        h: f64,
        n_steps: usize,
    ) -> Result<Self, SolverError> {
        if !h.is_finite() || h <= 0.0 {
            return Err(SolverError::InvalidConfig(format!(
                "step size h = {} must be positive and finite",
                h
            )));
        }
        if n_steps < 1 {
            return Err(SolverError::InvalidConfig(
                "step count must be at least 1".to_string(),
            ));
        }
        if !x0.is_finite() || !y0.is_finite() {
            return Err(SolverError::InvalidConfig(format!(
                "initial condition ({}, {}) must be finite",
                x0, y0
            )));
        }
        let mut solver_instance = Solvers::new(method);
        solver_instance.set_initial(f, x0, y0, h);
        Ok(fixedstepODE {
            method,
            x0,
            y0,
            h,
            n_steps,
            solver_instance,
            status: "running".to_string(),
            message: None,
            x_result: DVector::zeros(1),
            y_result: DVector::zeros(1),
        })
    }

    pub fn main_loop(&mut self) -> Result<Trajectory, SolverError> {
        let mut integr_status: Option<i8> = None;
        let mut x: Vec<f64> = Vec::with_capacity(self.n_steps + 1);
        let mut y: Vec<f64> = Vec::with_capacity(self.n_steps + 1);
        let mut step_count: usize = 0;
        x.push(self.x0);
        y.push(self.y0);

        while integr_status.is_none() {
            match &mut self.solver_instance {
                Solvers::Euler(euler) => {
                    euler.step(self.n_steps, &mut step_count, &mut self.status, &mut self.message);
                }
                Solvers::RK2(rk2) => {
                    rk2.step(self.n_steps, &mut step_count, &mut self.status, &mut self.message);
                }
                Solvers::RK4(rk4) => {
                    rk4.step(self.n_steps, &mut step_count, &mut self.status, &mut self.message);
                }
            };

            if self.status == "failed" {
                integr_status = Some(-1);
                break;
            }

            let (x_i, y_i) = match &self.solver_instance {
                Solvers::Euler(euler) => (euler.x, euler.y),
                Solvers::RK2(rk2) => (rk2.x, rk2.y),
                Solvers::RK4(rk4) => (rk4.x, rk4.y),
            };
            x.push(x_i);
            y.push(y_i);

            if self.status == "finished" {
                integr_status = Some(0);
            }
        }

        if integr_status == Some(-1) {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| "integration step failed".to_string());
            return Err(SolverError::NumericFailure(format!(
                "{} method: {}",
                self.method.name(),
                message
            )));
        }
        debug!(
            "{}: {} steps of h = {} done, terminal y = {}",
            self.method.name(),
            self.n_steps,
            self.h,
            y[y.len() - 1]
        );
        self.x_result = DVector::from_vec(x.clone());
        self.y_result = DVector::from_vec(y.clone());
        Ok(Trajectory::new(x, y))
    }

    pub fn solve(&mut self) -> Result<Trajectory, SolverError> {
        self.main_loop()
    }

    pub fn get_result(&self) -> (DVector<f64>, DVector<f64>) {
        (self.x_result.clone(), self.y_result.clone())
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////
/// Euler's method: y[i+1] = y[i] + h*f(x[i], y[i]). First order.
pub struct Euler {
    f: RhsFn,
    x0: f64,
    y0: f64,
    pub x: f64,
    pub y: f64,
    h: f64,
}

impl Euler {
    pub fn new() -> Euler {
        Euler {
            f: Rc::new(|x, _y| x),
            x0: 0.0,
            y0: 0.0,
            x: 0.0,
            y: 0.0,
            h: 0.1,
        }
    }

    pub fn set_initial(&mut self, f: RhsFn, x0: f64, y0: f64, h: f64) {
        self.f = f;
        self.x0 = x0;
        self.y0 = y0;
        self.h = h;
        self.x = x0;
        self.y = y0;
    }

    pub fn _step_impl(&mut self) -> bool {
        let k1 = self.h * (self.f)(self.x, self.y);
        let y_next = self.y + k1;
        if !y_next.is_finite() {
            return false;
        }
        self.y = y_next;
        self.x += self.h;
        true
    }
}

/// Midpoint RK2: k1 = h*f(x, y), k2 = h*f(x + h/2, y + k1/2),
/// y[i+1] = y[i] + k2. Second order.
pub struct RK2 {
    f: RhsFn,
    x0: f64,
    y0: f64,
    pub x: f64,
    pub y: f64,
    h: f64,
}

impl RK2 {
    pub fn new() -> RK2 {
        RK2 {
            f: Rc::new(|x, _y| x),
            x0: 0.0,
            y0: 0.0,
            x: 0.0,
            y: 0.0,
            h: 0.1,
        }
    }

    pub fn set_initial(&mut self, f: RhsFn, x0: f64, y0: f64, h: f64) {
        self.f = f;
        self.x0 = x0;
        self.y0 = y0;
        self.h = h;
        self.x = x0;
        self.y = y0;
    }

    pub fn _step_impl(&mut self) -> bool {
        let h = self.h;
        let k1 = h * (self.f)(self.x, self.y);
        let k2 = h * (self.f)(self.x + h / 2.0, self.y + k1 / 2.0);
        let y_next = self.y + k2;
        if !y_next.is_finite() {
            return false;
        }
        self.y = y_next;
        self.x += h;
        true
    }
}

/// Classic RK4 with the (k1 + 2*k2 + 2*k3 + k4)/6 update. Fourth order.
pub struct RK4 {
    f: RhsFn,
    x0: f64,
    y0: f64,
    pub x: f64,
    pub y: f64,
    h: f64,
}

impl RK4 {
    pub fn new() -> RK4 {
        RK4 {
            f: Rc::new(|x, _y| x),
            x0: 0.0,
            y0: 0.0,
            x: 0.0,
            y: 0.0,
            h: 0.1,
        }
    }

    pub fn set_initial(&mut self, f: RhsFn, x0: f64, y0: f64, h: f64) {
        self.f = f;
        self.x0 = x0;
        self.y0 = y0;
        self.h = h;
        self.x = x0;
        self.y = y0;
    }

    pub fn _step_impl(&mut self) -> bool {
        let h = self.h;
        let k1 = h * (self.f)(self.x, self.y);
        let k2 = h * (self.f)(self.x + h / 2.0, self.y + k1 / 2.0);
        let k3 = h * (self.f)(self.x + h / 2.0, self.y + k2 / 2.0);
        let k4 = h * (self.f)(self.x + h, self.y + k3);
        let y_next = self.y + (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0;
        if !y_next.is_finite() {
            return false;
        }
        self.y = y_next;
        self.x += h;
        true
    }
}
