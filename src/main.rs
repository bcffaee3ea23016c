#![allow(non_snake_case)]
use RKCompare::numerical::Compare_api::MethodComparison;
use RKCompare::numerical::Examples_and_utils::ODETestProblem;

// Thin presentation layer over the comparison session: initial solve,
// then a sweep over the step-size domain a slider would offer
// (multiples of 0.05 in [0.05, 1.0]), then plot and csv export.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (x0, y0, x1, h) = (0.0, 0.0, 5.0, 0.5);
    let problem = ODETestProblem::GaussianGrowth;
    let mut session = MethodComparison::new(
        problem.rhs(),
        Some(problem.exact_solution(x0, y0)),
        x0,
        y0,
        x1,
        h,
    )?;
    session.enable_info_logging();
    session.solve()?;
    println!("problem: {}", problem.name());
    if let Some(report) = session.get_error_report() {
        println!("{}", report);
    }

    for i in (1..=20).rev() {
        let h_new = i as f64 * 0.05;
        let (_trajectories, report) = session.on_step_size_changed(h_new)?;
        println!("\nh = {:.2}", h_new);
        println!("{}", report);
    }

    session.plot_result();
    session.save_result()?;
    Ok(())
}
