use crate::Utils::logger::save_columns_to_csv;
use crate::Utils::plots::plot_methods;
use crate::numerical::FixedStep_api::{Method, fixedstepODE};
use crate::numerical::RKF45_api::referenceODE;
use crate::numerical::common::{ExactFn, RhsFn, SolverError, Trajectory, steps_for_span};
use log::{info, warn};
use simplelog::*;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use strum::IntoEnumIterator;

/// Terminal-point absolute error of each fixed-step method against the
/// reference trajectory, keyed by method name.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    errors: HashMap<String, f64>,
}

impl ErrorReport {
    pub fn get(&self, method: Method) -> Option<f64> {
        self.errors.get(method.name()).copied()
    }

    pub fn as_map(&self) -> &HashMap<String, f64> {
        &self.errors
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        for method in Method::iter() {
            if let Some(err) = self.get(method) {
                lines.push(format!("Error in {}'s Method: {:.4}", method.name(), err));
            }
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Pure function of the terminal values: |y_method(xN) - y_ref(xN)| per method.
pub fn compute_error_report(terminals: &[(Method, f64)], y_reference: f64) -> ErrorReport {
    let errors = terminals
        .iter()
        .map(|&(method, y)| (method.name().to_string(), (y - y_reference).abs()))
        .collect();
    ErrorReport { errors }
}

/// Comparison session: one initial value problem, three fixed-step
/// trajectories, one reference trajectory and the terminal error report.
/// Lifecycle: construct, solve once, then react to step-size changes
/// through `on_step_size_changed`; all result state is replaced wholesale
/// on recompute, never mutated in place.
///
/// ```
/// use RKCompare::numerical::Compare_api::MethodComparison;
/// use std::rc::Rc;
///
/// let mut session =
///     MethodComparison::new(Rc::new(|x, _y| x), None, 0.0, 0.0, 5.0, 0.5).unwrap();
/// session.solve().unwrap();
/// println!("{}", session.get_error_report().unwrap());
/// let (_trajectories, _report) = session.on_step_size_changed(0.25).unwrap();
/// ```
pub struct MethodComparison {
    f: RhsFn,
    exact: Option<ExactFn>,
    x0: f64,
    y0: f64,
    /// fixed span endpoint used to derive the step count from h
    x1: f64,
    h: f64,
    n: usize,
    /// false keeps the reference computed at the initial (h, n) as a fixed
    /// baseline across step-size changes; true re-solves it each time
    recompute_reference: bool,
    trajectories: Vec<(Method, Trajectory)>,
    reference: Option<Trajectory>,
    exact_result: Option<Trajectory>,
    error_report: Option<ErrorReport>,
    // logging configuration
    log_level: Option<LevelFilter>,
    log_to_file: Option<String>,
    log_to_console: bool,
}

impl fmt::Display for MethodComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MethodComparison {{ x0: {}, y0: {}, x1: {}, h: {}, n: {} }}",
            self.x0, self.y0, self.x1, self.h, self.n
        )
    }
}

impl MethodComparison {
    pub fn new(
        f: RhsFn,
        exact: Option<ExactFn>,
        x0: f64,
        y0: f64,
        x1: f64,
        h: f64,
    ) -> Result<Self, SolverError> {
        let n = steps_for_span(x0, x1, h)?;
        if !y0.is_finite() {
            return Err(SolverError::InvalidConfig(format!(
                "initial value y0 = {} must be finite",
                y0
            )));
        }
        Ok(MethodComparison {
            f,
            exact,
            x0,
            y0,
            x1,
            h,
            n,
            recompute_reference: false,
            trajectories: Vec::new(),
            reference: None,
            exact_result: None,
            error_report: None,
            log_level: None,
            log_to_file: None,
            log_to_console: false,
        })
    }

    /// Select whether a step-size change re-solves the reference over the
    /// new span or keeps the initial fixed baseline (the default).
    pub fn set_recompute_reference(&mut self, recompute: bool) {
        self.recompute_reference = recompute;
    }

    pub fn step_size(&self) -> f64 {
        self.h
    }

    pub fn step_count(&self) -> usize {
        self.n
    }

    fn solve_reference(&self, h: f64, n: usize) -> Result<(Trajectory, Option<Trajectory>), SolverError> {
        let x_bound = self.x0 + n as f64 * h;
        let mut reference = referenceODE::new(
            self.f.clone(),
            self.exact.clone(),
            self.x0,
            self.y0,
            x_bound,
        )?;
        let traj = reference.solve()?;
        let exact_traj = reference.exact_solution();
        Ok((traj, exact_traj))
    }

    fn run_fixed_step(&self, h: f64, n: usize) -> Result<Vec<(Method, Trajectory)>, SolverError> {
        let mut trajectories = Vec::new();
        for method in Method::iter() {
            let mut solver =
                fixedstepODE::new(method, self.f.clone(), self.x0, self.y0, h, n)?;
            let traj = solver.solve()?;
            trajectories.push((method, traj));
        }
        Ok(trajectories)
    }

    fn rebuild_report(trajectories: &[(Method, Trajectory)], reference: &Trajectory) -> ErrorReport {
        let terminals: Vec<(Method, f64)> = trajectories
            .iter()
            .map(|(method, traj)| (*method, traj.terminal_y()))
            .collect();
        compute_error_report(&terminals, reference.terminal_y())
    }

    /// Initial solve: reference first, then the three fixed-step methods,
    /// then the terminal error report.
    pub fn solve(&mut self) -> Result<(), SolverError> {
        let start = Instant::now();
        let (reference, exact_result) = self.solve_reference(self.h, self.n)?;
        let trajectories = self.run_fixed_step(self.h, self.n)?;
        self.error_report = Some(Self::rebuild_report(&trajectories, &reference));
        self.trajectories = trajectories;
        self.reference = Some(reference);
        self.exact_result = exact_result;
        let duration = start.elapsed();
        info!(
            "initial solve with h = {} (n = {}) took {} ms",
            self.h,
            self.n,
            duration.as_millis()
        );
        Ok(())
    }

    /// Reaction to a step-size change event: validate h', derive
    /// n' = round((x1 - x0)/h'), rerun the fixed-step methods and rebuild
    /// the error report. The reference trajectory is left unchanged unless
    /// `recompute_reference` is set. Any failure, whether an invalid h' or
    /// a numeric failure during recompute, leaves the whole session state
    /// untouched so the caller may simply ignore the event.
    pub fn on_step_size_changed(
        &mut self,
        h_new: f64,
    ) -> Result<(&[(Method, Trajectory)], &ErrorReport), SolverError> {
        let n_new = steps_for_span(self.x0, self.x1, h_new)?;
        if self.reference.is_none() {
            warn!("on_step_size_changed called before solve()");
            return Err(SolverError::InvalidConfig(
                "solve() must run before a step-size change".to_string(),
            ));
        }
        let new_reference = if self.recompute_reference {
            Some(self.solve_reference(h_new, n_new)?)
        } else {
            None
        };
        let trajectories = self.run_fixed_step(h_new, n_new)?;
        let reference = match new_reference.as_ref() {
            Some((traj, _)) => traj,
            None => self.reference.as_ref().ok_or_else(|| {
                SolverError::InvalidConfig("reference trajectory missing".to_string())
            })?,
        };
        let report = Self::rebuild_report(&trajectories, reference);
        // no session field changes until every solve above has succeeded
        self.h = h_new;
        self.n = n_new;
        if let Some((reference, exact_result)) = new_reference {
            self.reference = Some(reference);
            self.exact_result = exact_result;
            info!("reference re-solved for h = {}", h_new);
        }
        self.error_report = Some(report);
        self.trajectories = trajectories;
        info!("recomputed with h = {} (n = {})", self.h, self.n);
        let report = self.error_report.as_ref().ok_or_else(|| {
            SolverError::InvalidConfig("error report missing".to_string())
        })?;
        Ok((&self.trajectories, report))
    }

    pub fn get_result(&self) -> &[(Method, Trajectory)] {
        &self.trajectories
    }

    pub fn trajectory(&self, method: Method) -> Option<&Trajectory> {
        self.trajectories
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, traj)| traj)
    }

    pub fn get_reference(&self) -> Option<&Trajectory> {
        self.reference.as_ref()
    }

    pub fn get_exact(&self) -> Option<&Trajectory> {
        self.exact_result.as_ref()
    }

    pub fn get_error_report(&self) -> Option<&ErrorReport> {
        self.error_report.as_ref()
    }

    pub fn plot_result(&self) {
        let mut series: Vec<(String, &Trajectory)> = self
            .trajectories
            .iter()
            .map(|(method, traj)| (method.name().to_string(), traj))
            .collect();
        if let Some(reference) = self.reference.as_ref() {
            series.push(("Reference".to_string(), reference));
        }
        if let Some(exact) = self.exact_result.as_ref() {
            series.push(("Exact".to_string(), exact));
        }
        plot_methods("methods_comparison", "x", "y", &series);
        println!("result plotted");
    }

    pub fn save_result(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_result_to(&std::env::current_dir()?)
    }

    /// Write the fixed-step trajectories and the reference trajectory into
    /// csv files under `dir`.
    pub fn save_result_to(&self, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let headers: Vec<String> = self
            .trajectories
            .iter()
            .map(|(method, _)| method.name().to_lowercase())
            .collect();
        if let Some((_, first)) = self.trajectories.first() {
            let columns: Vec<&Trajectory> =
                self.trajectories.iter().map(|(_, traj)| traj).collect();
            save_columns_to_csv(
                &dir.join("fixed_step_methods.csv"),
                "x",
                &headers,
                &first.x,
                &columns,
            )?;
        }
        if let Some(reference) = self.reference.as_ref() {
            save_columns_to_csv(
                &dir.join("reference.csv"),
                "x",
                &["reference".to_string()],
                &reference.x,
                &[reference],
            )?;
        }
        println!("result saved");
        Ok(())
    }

    ////////////////////////////////logging functions
    /// Set logging level (Off, Error, Warn, Info, Debug, Trace)
    pub fn set_log_level(&mut self, level: LevelFilter) {
        self.log_level = Some(level);
        self.init_logger();
    }

    /// Enable logging to file
    pub fn set_log_file(&mut self, filename: String) {
        self.log_to_file = Some(filename);
        self.init_logger();
    }

    /// Enable/disable console logging
    pub fn set_console_logging(&mut self, enabled: bool) {
        self.log_to_console = enabled;
        self.init_logger();
    }

    /// Initialize the logger based on current settings
    fn init_logger(&self) {
        let level = self.log_level.unwrap_or(LevelFilter::Info);

        let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

        if self.log_to_console {
            loggers.push(TermLogger::new(
                level,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            ));
        }

        if let Some(ref filename) = self.log_to_file {
            if let Ok(file) = File::create(filename) {
                loggers.push(WriteLogger::new(level, Config::default(), file));
            }
        }

        if !loggers.is_empty() {
            let _ = CombinedLogger::init(loggers);
        }
    }

    /// Enable debug logging
    pub fn enable_debug_logging(&mut self) {
        self.set_log_level(LevelFilter::Debug);
    }

    /// Enable info logging with console output
    pub fn enable_info_logging(&mut self) {
        self.log_to_console = true;
        self.set_log_level(LevelFilter::Info);
    }

    /// Disable logging
    pub fn disable_logging(&mut self) {
        self.set_log_level(LevelFilter::Off);
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_compare_api {
    use super::*;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn scenario_session() -> MethodComparison {
        // the reference scenario: y' = x, y(0) = 0 over [0, 5], h = 0.5
        let f: RhsFn = Rc::new(|x, _y| x);
        MethodComparison::new(f, None, 0.0, 0.0, 5.0, 0.5).unwrap()
    }

    #[test]
    fn test_initial_solve_produces_all_outputs() {
        let mut session = scenario_session();
        session.solve().unwrap();
        assert_eq!(session.get_result().len(), 3);
        for (_, traj) in session.get_result() {
            assert_eq!(traj.len(), 11);
        }
        assert!(session.get_reference().is_some());
        assert!(session.get_error_report().is_some());
    }

    #[test]
    fn test_scenario_terminal_values_and_error_ordering() {
        let mut session = scenario_session();
        session.solve().unwrap();
        // exact solution is y = x^2/2, terminal y(5) = 12.5
        let rk4 = session.trajectory(Method::RK4).unwrap();
        assert_relative_eq!(rk4.terminal_y(), 12.5, epsilon = 1e-9);
        let report = session.get_error_report().unwrap();
        let e_euler = report.get(Method::Euler).unwrap();
        let e_rk2 = report.get(Method::RK2).unwrap();
        let e_rk4 = report.get(Method::RK4).unwrap();
        assert_relative_eq!(e_euler, 1.25, epsilon = 1e-7);
        assert!(e_rk4 <= e_rk2);
        assert!(e_rk2 < e_euler);
    }

    #[test]
    fn test_strict_error_ordering_on_nonlinear_problem() {
        // y' = x + x*y, y(0) = 0: the three orders separate cleanly
        let f: RhsFn = Rc::new(|x, y| x + x * y);
        let mut session = MethodComparison::new(f, None, 0.0, 0.0, 5.0, 0.5).unwrap();
        session.solve().unwrap();
        let report = session.get_error_report().unwrap();
        let e_euler = report.get(Method::Euler).unwrap();
        let e_rk2 = report.get(Method::RK2).unwrap();
        let e_rk4 = report.get(Method::RK4).unwrap();
        assert!(e_rk4 < e_rk2, "rk4 {} !< rk2 {}", e_rk4, e_rk2);
        assert!(e_rk2 < e_euler, "rk2 {} !< euler {}", e_rk2, e_euler);
    }

    #[test]
    fn test_zero_derivative_gives_zero_errors() {
        let f: RhsFn = Rc::new(|_x, _y| 0.0);
        let mut session = MethodComparison::new(f, None, 0.0, 2.0, 5.0, 0.5).unwrap();
        session.solve().unwrap();
        let report = session.get_error_report().unwrap();
        for method in Method::iter() {
            assert_eq!(report.get(method).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_step_size_change_keeps_reference_by_default() {
        let mut session = scenario_session();
        session.solve().unwrap();
        let reference_before = session.get_reference().unwrap().clone();
        session.on_step_size_changed(0.3).unwrap();
        // n = round(5/0.3) = 17
        assert_eq!(session.step_count(), 17);
        for (_, traj) in session.get_result() {
            assert_eq!(traj.len(), 18);
        }
        assert_eq!(session.get_reference().unwrap(), &reference_before);
    }

    #[test]
    fn test_step_size_change_resolves_reference_when_enabled() {
        let mut session = scenario_session();
        session.set_recompute_reference(true);
        session.solve().unwrap();
        session.on_step_size_changed(0.3).unwrap();
        // new reference spans [0, 17 * 0.3] = [0, 5.1]
        let reference = session.get_reference().unwrap();
        assert_relative_eq!(reference.terminal_x(), 5.1, epsilon = 1e-9);
    }

    #[test]
    fn test_recompute_idempotence() {
        let mut session = scenario_session();
        session.solve().unwrap();
        session.on_step_size_changed(0.25).unwrap();
        let first: Vec<Trajectory> = session
            .get_result()
            .iter()
            .map(|(_, traj)| traj.clone())
            .collect();
        let first_report = session.get_error_report().unwrap().clone();
        session.on_step_size_changed(0.25).unwrap();
        let second: Vec<Trajectory> = session
            .get_result()
            .iter()
            .map(|(_, traj)| traj.clone())
            .collect();
        assert_eq!(first, second);
        assert_eq!(&first_report, session.get_error_report().unwrap());
    }

    #[test]
    fn test_invalid_step_size_rejected_and_state_untouched() {
        let mut session = scenario_session();
        session.solve().unwrap();
        let report_before = session.get_error_report().unwrap().clone();
        let h_before = session.step_size();

        for h_bad in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let result = session.on_step_size_changed(h_bad);
            assert!(matches!(result, Err(SolverError::InvalidConfig(_))));
        }
        assert_eq!(session.step_size(), h_before);
        assert_eq!(&report_before, session.get_error_report().unwrap());
    }

    // derivative poisoned at the one abscissa x = 0.3 that only the
    // h = 0.3 Euler grid ever evaluates; the adaptive reference and the
    // h = 0.5 grids never land there
    fn poisoned_rhs() -> RhsFn {
        Rc::new(|x, _y| if x == 0.3 { f64::NAN } else { x })
    }

    #[test]
    fn test_failed_step_size_change_leaves_state_intact() {
        let mut session =
            MethodComparison::new(poisoned_rhs(), None, 0.0, 0.0, 5.0, 0.5).unwrap();
        session.solve().unwrap();
        let report_before = session.get_error_report().unwrap().clone();

        let result = session.on_step_size_changed(0.3);
        assert!(matches!(result, Err(SolverError::NumericFailure(_))));
        assert_eq!(session.step_size(), 0.5);
        assert_eq!(session.step_count(), 10);
        for (_, traj) in session.get_result() {
            assert_eq!(traj.len(), 11);
        }
        assert_eq!(&report_before, session.get_error_report().unwrap());
    }

    #[test]
    fn test_failed_step_size_change_keeps_reference_with_recompute() {
        let mut session =
            MethodComparison::new(poisoned_rhs(), None, 0.0, 0.0, 5.0, 0.5).unwrap();
        session.set_recompute_reference(true);
        session.solve().unwrap();

        // the replacement reference over [0, 5.1] solves fine, but the
        // fixed-step failure must discard it along with everything else
        let result = session.on_step_size_changed(0.3);
        assert!(result.is_err());
        let reference = session.get_reference().unwrap();
        assert_relative_eq!(reference.terminal_x(), 5.0, epsilon = 1e-9);
        assert_eq!(session.step_size(), 0.5);
    }

    #[test]
    fn test_step_size_change_before_solve_is_rejected() {
        let mut session = scenario_session();
        let result = session.on_step_size_changed(0.25);
        assert!(matches!(result, Err(SolverError::InvalidConfig(_))));
    }

    #[test]
    fn test_slider_domain_tolerated() {
        // the presentation layer quantizes h to multiples of 0.05 in
        // [0.05, 1.0]; every such value must be accepted
        let mut session = scenario_session();
        session.solve().unwrap();
        for i in 1..=20 {
            let h = i as f64 * 0.05;
            let (trajectories, _report) = session.on_step_size_changed(h).unwrap();
            let n = ((5.0 - 0.0) / h).round() as usize;
            assert_eq!(trajectories[0].1.len(), n + 1);
        }
    }

    #[test]
    fn test_error_report_display_four_decimals() {
        let mut session = scenario_session();
        session.solve().unwrap();
        let text = format!("{}", session.get_error_report().unwrap());
        assert!(text.contains("Error in Euler's Method: 1.2500"));
        assert!(text.contains("Error in RK2's Method: 0.0000"));
        assert!(text.contains("Error in RK4's Method: 0.0000"));
    }

    #[test]
    fn test_compute_error_report_is_pure() {
        let terminals = vec![
            (Method::Euler, 11.25),
            (Method::RK2, 12.5),
            (Method::RK4, 12.5),
        ];
        let report = compute_error_report(&terminals, 12.5);
        assert_eq!(report.get(Method::Euler).unwrap(), 1.25);
        assert_eq!(report.get(Method::RK2).unwrap(), 0.0);
        let again = compute_error_report(&terminals, 12.5);
        assert_eq!(report, again);
    }

    #[test]
    fn test_exact_trajectory_exposed_when_configured() {
        let f: RhsFn = Rc::new(|x, _y| x);
        let exact: ExactFn = Rc::new(|x: f64| x * x / 2.0);
        let mut session = MethodComparison::new(f, Some(exact), 0.0, 0.0, 5.0, 0.5).unwrap();
        session.solve().unwrap();
        let exact_traj = session.get_exact().unwrap();
        assert_relative_eq!(exact_traj.terminal_y(), 12.5, epsilon = 1e-12);
    }

    #[test]
    fn test_numeric_failure_propagates_from_session() {
        let f: RhsFn = Rc::new(|x, _y| (x - 10.0).sqrt());
        let session = MethodComparison::new(f, None, 0.0, 0.0, 5.0, 0.5);
        let mut session = session.unwrap();
        let result = session.solve();
        assert!(result.is_err());
    }

    #[test]
    fn test_save_result_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = scenario_session();
        session.solve().unwrap();
        session.save_result_to(dir.path()).unwrap();
        let methods_csv =
            std::fs::read_to_string(dir.path().join("fixed_step_methods.csv")).unwrap();
        assert!(methods_csv.starts_with("x,euler,rk2,rk4"));
        assert!(dir.path().join("reference.csv").exists());
    }
}
