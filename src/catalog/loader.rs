use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{BandFlux, MetadataValue, ModelSpectrum, PhotometryCatalog, PhotometryRow};
use crate::fluxing::{BroadbandSed, FilterBank, SpectralEnergyDistribution};

/// Model-library column with wavelengths in micron.
pub const WAVELENGTH_COLUMN: &str = "wavelength";
/// Model-library column with `F_ν` in Jy.
pub const FNU_COLUMN: &str = "fnu";
/// Photometry column identifying the object.
pub const ID_COLUMN: &str = "id";
/// Suffix of a band's flux-error column.
pub const ERROR_SUFFIX: &str = "_err";

// ---------------------------------------------------------------------------
// Generic table rows
// ---------------------------------------------------------------------------

/// One cell of a loaded table: a scalar, or a float list (spectra).
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Value(MetadataValue),
    List(Vec<f64>),
}

type Record = BTreeMap<String, Cell>;

/// Read any supported table into records.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – scalar columns plus `List<Float64>` columns for spectra
/// * `.json`    – `[{ "wavelength": [...], "fnu": [...], ...meta }, ...]`
/// * `.csv`     – header row; list cells are semicolon-separated floats
fn read_records(path: &Path) -> Result<Vec<Record>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "parquet" | "pq" => read_parquet(path),
        "json" => read_json(path),
        "csv" => read_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    info!("read {} rows from {}", records.len(), path.display());
    Ok(records)
}

// ---------------------------------------------------------------------------
// Model libraries
// ---------------------------------------------------------------------------

/// Load a library of model spectra (`wavelength` in micron, `fnu` in Jy).
pub fn load_models(path: &Path) -> Result<Vec<ModelSpectrum>> {
    read_records(path)?
        .into_iter()
        .enumerate()
        .map(|(i, mut record)| -> Result<ModelSpectrum> {
            let wavelengths = take_list(&mut record, WAVELENGTH_COLUMN, i)?;
            let fnu = take_list(&mut record, FNU_COLUMN, i)?;
            if wavelengths.len() != fnu.len() {
                bail!(
                    "Row {i}: {WAVELENGTH_COLUMN} has {} values but {FNU_COLUMN} has {}",
                    wavelengths.len(),
                    fnu.len()
                );
            }
            Ok(ModelSpectrum {
                wavelengths,
                fnu,
                metadata: scalar_metadata(record, i),
            })
        })
        .collect()
}

fn take_list(record: &mut Record, column: &str, row: usize) -> Result<Vec<f64>> {
    match record.remove(column) {
        Some(Cell::List(values)) => Ok(values),
        Some(Cell::Value(v)) => bail!("Row {row}: '{column}' should be a list of numbers, got {v}"),
        None => bail!("Row {row}: missing '{column}' column"),
    }
}

fn scalar_metadata(record: Record, row: usize) -> BTreeMap<String, MetadataValue> {
    record
        .into_iter()
        .filter_map(|(col, cell)| match cell {
            Cell::Value(v) => Some((col, v)),
            Cell::List(_) => {
                debug!("Row {row}: list column '{col}' ignored");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Photometry catalogs
// ---------------------------------------------------------------------------

/// Load per-object band fluxes (Jy).
///
/// Each of `bands` must be a column of the table; a `<band>_err` column, when
/// present, holds the band's flux error. Empty cells and `NaN` are missing
/// values.
pub fn load_photometry(path: &Path, bands: &[String]) -> Result<PhotometryCatalog> {
    let records = read_records(path)?;

    for band in bands {
        if !records.iter().any(|r| r.contains_key(band)) {
            bail!("{}: no column for band '{band}'", path.display());
        }
    }

    let rows = records
        .into_iter()
        .enumerate()
        .map(|(i, mut record)| -> Result<PhotometryRow> {
            let id = match record.remove(ID_COLUMN) {
                Some(Cell::Value(v)) => v,
                _ => MetadataValue::Integer(i as i64),
            };
            let fluxes = bands
                .iter()
                .map(|band| -> Result<BandFlux> {
                    let flux = take_number(&mut record, band, i)?;
                    let error = take_number(&mut record, &format!("{band}{ERROR_SUFFIX}"), i)?;
                    Ok(BandFlux {
                        band: band.clone(),
                        flux,
                        error,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(PhotometryRow {
                id,
                bands: fluxes,
                metadata: scalar_metadata(record, i),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PhotometryCatalog {
        bands: bands.to_vec(),
        rows,
    })
}

fn take_number(record: &mut Record, column: &str, row: usize) -> Result<Option<f64>> {
    match record.remove(column) {
        None | Some(Cell::Value(MetadataValue::Null)) => Ok(None),
        Some(Cell::Value(v)) => {
            let value = v
                .as_f64()
                .with_context(|| format!("Row {row}, {column}: '{v}' is not a number"))?;
            Ok(Some(value).filter(|x| !x.is_nan()))
        }
        Some(Cell::List(_)) => bail!("Row {row}, {column}: expected a number, got a list"),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write labelled broadband SEDs as CSV: `id`, then one column per band.
///
/// Bands are resolved through `bank`, and cells are matched to them by the
/// filter file behind each point, so aliases of one curve (`WISE_3.4`,
/// `wise1`) each get their value. Points are consumed in band order, and two
/// bands through the same file take successive points. A band with no point of
/// its own takes the first point through its file, or stays empty when the SED
/// has none.
pub fn write_broadband_csv<W: Write>(
    out: W,
    bank: &FilterBank,
    bands: &[String],
    rows: &[(String, BroadbandSed)],
) -> Result<()> {
    let band_files = bands
        .iter()
        .map(|band| -> Result<PathBuf> { Ok(bank.get(band)?.path().to_path_buf()) })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec![ID_COLUMN.to_string()];
    header.extend(bands.iter().cloned());
    writer.write_record(&header).context("writing CSV header")?;

    for (label, sed) in rows {
        let mut record = vec![label.clone()];
        record.extend(band_cells(sed, &band_files));
        writer
            .write_record(&record)
            .with_context(|| format!("writing row {label}"))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

fn band_cells(sed: &BroadbandSed, band_files: &[PathBuf]) -> Vec<String> {
    let filters = sed.filters();
    let mut next = 0;
    band_files
        .iter()
        .map(|file| {
            let point = if filters.get(next).is_some_and(|f| f.path() == file) {
                next += 1;
                Some(next - 1)
            } else {
                filters.iter().position(|f| f.path() == file)
            };
            point.map(|i| sed.fnu()[i].to_string()).unwrap_or_default()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

fn read_json(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| -> Result<Record> {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            obj.iter()
                .map(|(key, val)| -> Result<(String, Cell)> {
                    Ok((key.clone(), json_to_cell(val, i, key)?))
                })
                .collect()
        })
        .collect()
}

fn json_to_cell(val: &JsonValue, row: usize, col: &str) -> Result<Cell> {
    let cell = match val {
        JsonValue::Array(items) => Cell::List(
            items
                .iter()
                .enumerate()
                .map(|(j, v)| {
                    v.as_f64()
                        .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
                })
                .collect::<Result<_>>()?,
        ),
        JsonValue::String(s) => Cell::Value(MetadataValue::String(s.clone())),
        JsonValue::Number(n) => Cell::Value(match n.as_i64() {
            Some(i) => MetadataValue::Integer(i),
            None => n
                .as_f64()
                .map(MetadataValue::Float)
                .unwrap_or_else(|| MetadataValue::String(n.to_string())),
        }),
        JsonValue::Bool(b) => Cell::Value(MetadataValue::Bool(*b)),
        JsonValue::Null => Cell::Value(MetadataValue::Null),
        other => Cell::Value(MetadataValue::String(other.to_string())),
    };
    Ok(cell)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut row = Record::new();
        for (col, value) in headers.iter().zip(record.iter()) {
            let value = value.trim();
            let cell = if value.contains(';') {
                Cell::List(parse_semicolon_floats(value, row_no, col)?)
            } else {
                Cell::Value(guess_metadata_type(value))
            };
            row.insert(col.clone(), cell);
        }
        records.push(row);
    }
    Ok(records)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

fn guess_metadata_type(s: &str) -> MetadataValue {
    if s.is_empty() {
        return MetadataValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return MetadataValue::Float(f);
    }
    if s == "true" || s == "false" {
        return MetadataValue::Bool(s == "true");
    }
    MetadataValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Works with files written by Pandas (`df.to_parquet()`), Polars and the
/// `generate_sample` binary.
fn read_parquet(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        for row in 0..batch.num_rows() {
            let mut record = Record::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let column = batch.column(col_idx);
                let cell = match column.data_type() {
                    DataType::List(_) | DataType::LargeList(_) => {
                        Cell::List(extract_f64_list(column, row).with_context(|| {
                            format!("Row {row}: failed to read '{}'", field.name())
                        })?)
                    }
                    _ => Cell::Value(extract_scalar(column, row)),
                };
                record.insert(field.name().clone(), cell);
            }
            records.push(record);
        }
    }
    Ok(records)
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else {
        bail!("List inner type is {:?}, expected Float64 or Float32", values.data_type())
    }
}

/// Extract one scalar cell; unsupported types are rendered as text.
fn extract_scalar(col: &Arc<dyn Array>, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| MetadataValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => Some(MetadataValue::String(
            col.as_string::<i64>().value(row).to_string(),
        )),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| MetadataValue::Integer(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| MetadataValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| MetadataValue::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| MetadataValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| MetadataValue::Bool(a.value(row))),
        _ => None,
    };
    value.unwrap_or_else(|| MetadataValue::String(format!("{:?}", col.data_type())))
}
