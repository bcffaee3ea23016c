use crate::numerical::common::Trajectory;

/// Draw every trajectory of the comparison on one chart (the fixed-step
/// methods, the reference and, when present, the exact solution) and save
/// it as `<name>.png`.
pub fn plot_methods(name: &str, arg: &str, value: &str, series: &[(String, &Trajectory)]) {
    use plotters::prelude::*;
    if series.is_empty() {
        return;
    }
    let x_min = series
        .iter()
        .map(|(_, traj)| traj.x.min())
        .fold(f64::INFINITY, f64::min);
    let x_max = series
        .iter()
        .map(|(_, traj)| traj.x.max())
        .fold(f64::NEG_INFINITY, f64::max);
    let y_min = series
        .iter()
        .map(|(_, traj)| traj.y.min())
        .fold(f64::INFINITY, f64::min);
    let y_max = series
        .iter()
        .map(|(_, traj)| traj.y.max())
        .fold(f64::NEG_INFINITY, f64::max);

    let filename = format!("{}.png", name);
    let root_area = BitMapBackend::new(&filename, (800, 600)).into_drawing_area();
    root_area.fill(&WHITE).unwrap();

    let mut chart = ChartBuilder::on(&root_area)
        .caption(name.to_string(), ("sans-serif", 50))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(30)
        .build_cartesian_2d(
            x_min - 0.05 * (x_max - x_min)..x_max + 0.05 * (x_max - x_min),
            y_min - 0.05 * (y_max - y_min)..y_max + 0.05 * (y_max - y_min),
        )
        .unwrap();

    chart
        .configure_mesh()
        .x_desc(arg)
        .y_desc(value)
        .draw()
        .unwrap();

    for (col, (varname, traj)) in series.iter().enumerate() {
        let points: Vec<(f64, f64)> = traj
            .x
            .iter()
            .zip(traj.y.iter())
            .map(|(&x, &y)| (x, y))
            .collect();
        chart
            .draw_series(LineSeries::new(points, &Palette99::pick(col)))
            .unwrap()
            .label(format!(" {}", varname))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(col))
            });
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .unwrap();
}

use gnuplot::{AxesCommon, Caption, Color, Figure};
pub fn plot_methods_gnuplot(name: &str, arg: &str, value: &str, series: &[(String, &Trajectory)]) {
    const COLORS: [&str; 5] = ["blue", "red", "green", "black", "orange"];
    let mut fg = Figure::new();
    {
        let axes = fg.axes2d();
        axes.set_title(name, &[]).set_x_label(arg, &[]).set_y_label(value, &[]);
        for (col, (varname, traj)) in series.iter().enumerate() {
            let y_col: Vec<f64> = traj.y.iter().copied().collect();
            axes.lines(
                traj.x.as_slice(),
                &y_col,
                &[
                    Caption(varname),
                    Color(gnuplot::RGBString(COLORS[col % COLORS.len()])),
                ],
            );
        }
    }
    let filename = format!("{}.png", name);
    fg.save_to_png(&filename, 800, 600).unwrap();
}
