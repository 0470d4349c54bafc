//! Writes `sample_models.parquet`: blackbody spectra in the layout
//! `sedflux convolve` reads.

use std::sync::Arc;

use arrow::array::{Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const PLANCK: f64 = 6.62607015e-34;
const BOLTZMANN: f64 = 1.380649e-23;
const SPEED_OF_LIGHT_UM: f64 = 2.99792458e14;

/// Blackbody `F_ν` shape (arbitrary scale) at wavelength `wl` in micron.
fn blackbody(wl: f64, temperature: f64) -> f64 {
    let nu = SPEED_OF_LIGHT_UM / wl;
    let x = PLANCK * nu / (BOLTZMANN * temperature);
    nu.powi(3) / x.exp_m1()
}

fn main() {
    // 0.1 → 1000 micron, log-spaced
    let n = 1000;
    let wavelengths: Vec<f64> = (0..n)
        .map(|i| 10f64.powf(-1.0 + 4.0 * i as f64 / (n - 1) as f64))
        .collect();

    let temperatures = [30.0, 300.0, 3000.0, 5800.0, 10000.0, 30000.0];

    let mut ids = Vec::new();
    let mut wl_builder = ListBuilder::new(Float64Builder::new());
    let mut fnu_builder = ListBuilder::new(Float64Builder::new());

    for &t in &temperatures {
        let shape: Vec<f64> = wavelengths.iter().map(|&wl| blackbody(wl, t)).collect();
        // Peak normalised to 1 Jy.
        let peak = shape.iter().cloned().fold(0.0, f64::max);

        let values = wl_builder.values();
        for &wl in &wavelengths {
            values.append_value(wl);
        }
        wl_builder.append(true);

        let values = fnu_builder.values();
        for &f in &shape {
            values.append_value(f / peak);
        }
        fnu_builder.append(true);

        ids.push(format!("bb_{t:.0}K"));
    }

    let id_array = StringArray::from(ids.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    let t_array = Float64Array::from(temperatures.to_vec());
    let wl_array = wl_builder.finish();
    let fnu_array = fnu_builder.finish();

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("wavelength", list_type.clone(), false),
        Field::new("fnu", list_type, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(id_array),
            Arc::new(t_array),
            Arc::new(wl_array),
            Arc::new(fnu_array),
        ],
    )
    .expect("Failed to create RecordBatch");

    let output_path = "sample_models.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} model spectra ({} wavelengths each) to {output_path}",
        temperatures.len(),
        wavelengths.len()
    );
}
