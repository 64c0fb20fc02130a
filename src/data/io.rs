//! Parquet read/write for photon event records.
//!
//! The input format is columnar: one row per event, scalar `trigP`, and one
//! Arrow `List` column per photon field. Float columns may be stored as
//! `Float32` or `Float64`; values are widened to `f64` on load.

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float32Array, Float64Array, Float64Builder,
    ListArray, ListBuilder, RecordBatch,
};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::data::{Dataset, EventData, Photon};
use crate::{AnalysisError, AnalysisResult};

/// The scalar trigger column.
pub const TRIGGER_COLUMN: &str = "trigP";
/// The per-photon list columns, in the order the loader reads them.
pub const PHOTON_COLUMNS: &[&str] = &[
    "photon_pt",
    "photon_eta",
    "photon_phi",
    "photon_E",
    "photon_isTightID",
    "photon_ptcone30",
    "photon_etcone20",
];

/// Load a [`Dataset`] from a Parquet file.
///
/// Fails with a data-access error if the file cannot be opened or any
/// expected column is absent or mistyped.
pub fn read_parquet(file_path: &Path) -> AnalysisResult<Dataset> {
    let display_path = file_path.display().to_string();
    let file = File::open(file_path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema();
    for name in std::iter::once(&TRIGGER_COLUMN).chain(PHOTON_COLUMNS) {
        if schema.field_with_name(name).is_err() {
            return Err(AnalysisError::MissingColumn {
                name: (*name).to_string(),
                path: display_path,
            });
        }
    }
    let reader = builder.build()?;
    let mut events = Vec::new();
    for batch in reader {
        let batch = batch?;
        decode_record_batch(&batch, &display_path, &mut events)?;
    }
    Ok(Dataset::new(events))
}

/// Row count and column names of a Parquet file, without decoding it.
pub fn peek_parquet(file_path: &Path) -> AnalysisResult<(i64, Vec<String>)> {
    let file = File::open(file_path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let n_rows = builder.metadata().file_metadata().num_rows();
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    Ok((n_rows, columns))
}

fn decode_record_batch(
    batch: &RecordBatch,
    path: &str,
    events: &mut Vec<EventData>,
) -> AnalysisResult<()> {
    let trigger = bool_column(batch, TRIGGER_COLUMN, path)?;
    let [pt, eta, phi, e, tight, ptcone30, etcone20] = [
        "photon_pt",
        "photon_eta",
        "photon_phi",
        "photon_E",
        "photon_isTightID",
        "photon_ptcone30",
        "photon_etcone20",
    ]
    .map(|name| list_column(batch, name, path));
    let (pt, eta, phi, e) = (pt?, eta?, phi?, e?);
    let (tight, ptcone30, etcone20) = (tight?, ptcone30?, etcone20?);

    for row in 0..batch.num_rows() {
        let pt = float_list_values(&pt.value(row), "photon_pt", path)?;
        let eta = float_list_values(&eta.value(row), "photon_eta", path)?;
        let phi = float_list_values(&phi.value(row), "photon_phi", path)?;
        let e = float_list_values(&e.value(row), "photon_E", path)?;
        let tight = bool_list_values(&tight.value(row), "photon_isTightID", path)?;
        let ptcone30 = float_list_values(&ptcone30.value(row), "photon_ptcone30", path)?;
        let etcone20 = float_list_values(&etcone20.value(row), "photon_etcone20", path)?;

        let n = pt.len();
        if [eta.len(), phi.len(), e.len(), tight.len(), ptcone30.len(), etcone20.len()]
            .iter()
            .any(|len| *len != n)
        {
            return Err(AnalysisError::Custom(format!(
                "Photon columns disagree on particle count in row {} of '{path}'",
                events.len()
            )));
        }

        let photons = (0..n)
            .map(|i| Photon {
                pt: pt[i],
                eta: eta[i],
                phi: phi[i],
                e: e[i],
                is_tight_id: tight[i],
                ptcone30: ptcone30[i],
                etcone20: etcone20[i],
            })
            .collect();
        events.push(EventData {
            photons,
            trigger: trigger.is_valid(row) && trigger.value(row),
        });
    }
    Ok(())
}

fn bool_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &str,
) -> AnalysisResult<&'a BooleanArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<BooleanArray>())
        .ok_or_else(|| AnalysisError::MissingColumn {
            name: name.to_string(),
            path: path.to_string(),
        })
}

fn list_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &str,
) -> AnalysisResult<&'a ListArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<ListArray>())
        .ok_or_else(|| AnalysisError::MissingColumn {
            name: name.to_string(),
            path: path.to_string(),
        })
}

fn float_list_values(values: &ArrayRef, name: &str, path: &str) -> AnalysisResult<Vec<f64>> {
    if let Some(array) = values.as_any().downcast_ref::<Float64Array>() {
        Ok((0..array.len()).map(|i| array.value(i)).collect())
    } else if let Some(array) = values.as_any().downcast_ref::<Float32Array>() {
        Ok((0..array.len()).map(|i| array.value(i) as f64).collect())
    } else {
        Err(AnalysisError::MissingColumn {
            name: name.to_string(),
            path: path.to_string(),
        })
    }
}

fn bool_list_values(values: &ArrayRef, name: &str, path: &str) -> AnalysisResult<Vec<bool>> {
    values
        .as_any()
        .downcast_ref::<BooleanArray>()
        .map(|array| (0..array.len()).map(|i| array.value(i)).collect())
        .ok_or_else(|| AnalysisError::MissingColumn {
            name: name.to_string(),
            path: path.to_string(),
        })
}

/// Persist a [`Dataset`] to a Parquet file in the column layout the loader
/// expects.
pub fn write_parquet(dataset: &Dataset, file_path: &Path) -> AnalysisResult<()> {
    let mut trigger = BooleanBuilder::new();
    let mut pt = ListBuilder::new(Float64Builder::new());
    let mut eta = ListBuilder::new(Float64Builder::new());
    let mut phi = ListBuilder::new(Float64Builder::new());
    let mut e = ListBuilder::new(Float64Builder::new());
    let mut tight = ListBuilder::new(BooleanBuilder::new());
    let mut ptcone30 = ListBuilder::new(Float64Builder::new());
    let mut etcone20 = ListBuilder::new(Float64Builder::new());

    for event in dataset.iter() {
        trigger.append_value(event.trigger);
        for photon in &event.photons {
            pt.values().append_value(photon.pt);
            eta.values().append_value(photon.eta);
            phi.values().append_value(photon.phi);
            e.values().append_value(photon.e);
            tight.values().append_value(photon.is_tight_id);
            ptcone30.values().append_value(photon.ptcone30);
            etcone20.values().append_value(photon.etcone20);
        }
        pt.append(true);
        eta.append(true);
        phi.append(true);
        e.append(true);
        tight.append(true);
        ptcone30.append(true);
        etcone20.append(true);
    }

    let batch = RecordBatch::try_from_iter(vec![
        (TRIGGER_COLUMN, Arc::new(trigger.finish()) as ArrayRef),
        ("photon_pt", Arc::new(pt.finish()) as ArrayRef),
        ("photon_eta", Arc::new(eta.finish()) as ArrayRef),
        ("photon_phi", Arc::new(phi.finish()) as ArrayRef),
        ("photon_E", Arc::new(e.finish()) as ArrayRef),
        ("photon_isTightID", Arc::new(tight.finish()) as ArrayRef),
        ("photon_ptcone30", Arc::new(ptcone30.finish()) as ArrayRef),
        ("photon_etcone20", Arc::new(etcone20.finish()) as ArrayRef),
    ])?;
    let file = File::create(file_path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic_dataset;
    use approx::assert_relative_eq;

    #[test]
    fn test_parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.parquet");
        let dataset = synthetic_dataset(100, 3);
        write_parquet(&dataset, &path).unwrap();
        let loaded = read_parquet(&path).unwrap();
        assert_eq!(loaded.n_events(), dataset.n_events());
        for (a, b) in dataset.iter().zip(loaded.iter()) {
            assert_eq!(a.trigger, b.trigger);
            assert_eq!(a.photons.len(), b.photons.len());
            for (pa, pb) in a.photons.iter().zip(b.photons.iter()) {
                assert_relative_eq!(pa.pt, pb.pt);
                assert_relative_eq!(pa.eta, pb.eta);
                assert_relative_eq!(pa.phi, pb.phi);
                assert_relative_eq!(pa.e, pb.e);
                assert_eq!(pa.is_tight_id, pb.is_tight_id);
            }
        }
    }

    #[test]
    fn test_peek_reports_rows_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.parquet");
        write_parquet(&synthetic_dataset(25, 1), &path).unwrap();
        let (rows, columns) = peek_parquet(&path).unwrap();
        assert_eq!(rows, 25);
        assert!(columns.iter().any(|c| c == "photon_pt"));
        assert!(columns.iter().any(|c| c == TRIGGER_COLUMN));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.parquet");
        // A file with only the trigger column.
        let mut trigger = BooleanBuilder::new();
        trigger.append_value(true);
        let batch = RecordBatch::try_from_iter(vec![(
            TRIGGER_COLUMN,
            Arc::new(trigger.finish()) as ArrayRef,
        )])
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let err = read_parquet(&path).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MissingColumn { ref name, .. } if name == "photon_pt"
        ));
    }
}
