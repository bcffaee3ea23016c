use crate::numerical::common::Trajectory;
use csv::Writer;
use nalgebra::DVector;
use std::fs::File;
use std::io;
use std::path::Path;

/// Write trajectories sharing one x mesh into a csv file: header row
/// (arg + one name per column), then one row per grid point.
pub fn save_columns_to_csv(
    filename: &Path,
    arg: &str,
    headers: &[String],
    x_mesh: &DVector<f64>,
    columns: &[&Trajectory],
) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);

    let mut headers_with_x = Vec::new();
    headers_with_x.push(arg.to_string());
    headers_with_x.extend(headers.iter().cloned());
    writer.write_record(&headers_with_x)?;

    for i in 0..x_mesh.len() {
        let mut row_data = Vec::new();
        row_data.push(x_mesh[i].to_string());
        for traj in columns {
            row_data.push(traj.y[i].to_string());
        }
        writer.write_record(&row_data)?;
    }

    writer.flush()?;
    Ok(())
}
