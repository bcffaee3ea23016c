/// shared types of the solver core: right-hand side and exact-solution
/// function types, Trajectory, the failure taxonomy, step-count derivation
pub mod common;
/// Example#1
/// ```
/// // solve y' = x + x*y, y(0) = 0 with classic RK4 on a fixed grid
/// use RKCompare::numerical::FixedStep_api::{Method, fixedstepODE};
/// use std::rc::Rc;
///
/// let mut solver =
///     fixedstepODE::new(Method::RK4, Rc::new(|x, y| x + x * y), 0.0, 0.0, 0.5, 10).unwrap();
/// let trajectory = solver.solve().unwrap();
/// assert_eq!(trajectory.len(), 11);
/// ```
pub mod FixedStep_api;
/// Example#2
/// ```
/// // high-accuracy adaptive reference solution on a 50-point sample grid
/// use RKCompare::numerical::RKF45_api::referenceODE;
/// use std::rc::Rc;
///
/// let mut reference = referenceODE::new(Rc::new(|_x, y| -y), None, 0.0, 1.0, 2.0).unwrap();
/// let trajectory = reference.solve().unwrap();
/// println!("y(2) = {}", trajectory.terminal_y());
/// ```
pub mod RKF45_api;
/// Example#3
/// ```
/// // full comparison session reacting to step-size changes
/// use RKCompare::numerical::Compare_api::MethodComparison;
/// use std::rc::Rc;
///
/// let mut session =
///     MethodComparison::new(Rc::new(|x, _y| x), None, 0.0, 0.0, 5.0, 0.5).unwrap();
/// session.solve().unwrap();
/// let (_trajectories, report) = session.on_step_size_changed(0.25).unwrap();
/// println!("{}", report);
/// ```
pub mod Compare_api;
pub mod Examples_and_utils;
