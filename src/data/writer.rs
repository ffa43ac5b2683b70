use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::model::WaferDataset;

// ---------------------------------------------------------------------------
// ArtifactSink – where reduced datasets go after each round
// ---------------------------------------------------------------------------

/// Persistence collaborator for per-round artifacts.
///
/// The round controller only derives identifiers; whoever owns the campaign
/// decides where (and whether) the reduced dataset lands on disk.
pub trait ArtifactSink {
    /// Persist `dataset` under `artifact_id`, returning the written path.
    fn persist(&mut self, artifact_id: &str, dataset: &WaferDataset) -> Result<PathBuf>;
}

/// Writes artifacts as `{dir}/{artifact_id}.csv`, one row per sample, with
/// the dataset's own column names as header.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvSink { dir: dir.into() }
    }
}

impl ArtifactSink for CsvSink {
    fn persist(&mut self, artifact_id: &str, dataset: &WaferDataset) -> Result<PathBuf> {
        let path = self.dir.join(format!("{artifact_id}.csv"));
        write_csv(&path, dataset)?;
        Ok(path)
    }
}

/// Write a dataset to a CSV file at `path`.
pub fn write_csv(path: &Path, dataset: &WaferDataset) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer
        .write_record(&dataset.columns)
        .context("writing header")?;

    for sample in &dataset.samples {
        writer
            .write_record(&[
                sample.x.to_string(),
                sample.y.to_string(),
                sample.thickness.to_string(),
            ])
            .context("writing row")?;
    }

    writer.flush().context("flushing csv")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_file;
    use crate::data::model::Sample;

    #[test]
    fn sink_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = WaferDataset::from_samples(vec![
            Sample { x: 0.0, y: 0.0, thickness: 50.25 },
            Sample { x: 10.0, y: -5.0, thickness: 49.75 },
            Sample { x: -3.5, y: 7.0, thickness: 51.0 },
        ]);
        ds.columns = ["X_mm".into(), "Y_mm".into(), "Thk_nm".into()];

        let mut sink = CsvSink::new(dir.path());
        let path = sink.persist("w01_outlier_removed", &ds).unwrap();
        assert_eq!(path.file_name().unwrap(), "w01_outlier_removed.csv");

        let reloaded = load_file(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.columns, ds.columns);
        assert_eq!(reloaded.samples[1], ds.samples[1]);
    }
}
