use std::path::Path;

use anyhow::{bail, Context, Result};

use super::model::{Sample, WaferDataset};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a wafer thickness map from a delimited file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv` – comma separated
/// * `.txt` / `.tsv` / `.dat` – tab separated
///
/// Only the first three columns are read, as (x, y, thickness). An optional
/// header row is detected and its names preserved for file output. Rows
/// whose first three fields do not all parse as numbers are skipped.
pub fn load_file(path: &Path) -> Result<WaferDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let delimiter = match ext.as_str() {
        "csv" => b',',
        "txt" | "tsv" | "dat" => b'\t',
        other => bail!("Unsupported file extension: .{other}"),
    };

    load_delimited(path, delimiter)
}

// ---------------------------------------------------------------------------
// Delimited reader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, delimiter: u8) -> Result<WaferDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut columns = WaferDataset::default_columns();
    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;

        match parse_row(&record) {
            Some(sample) => samples.push(sample),
            None => {
                // The first unparseable row is taken as the header.
                if row_no == 0 && record.len() >= 3 {
                    for (slot, field) in columns.iter_mut().zip(record.iter().take(3)) {
                        *slot = field.to_string();
                    }
                } else {
                    skipped += 1;
                }
            }
        }
    }

    if skipped > 0 {
        log::debug!(
            "{}: skipped {skipped} non-numeric row(s)",
            path.display()
        );
    }

    if samples.len() < 3 {
        bail!(
            "{}: at least 3 valid data points required, found {}",
            path.display(),
            samples.len()
        );
    }

    Ok(WaferDataset { samples, columns })
}

/// Parse the first three fields of a record as (x, y, thickness).
fn parse_row(record: &csv::StringRecord) -> Option<Sample> {
    if record.len() < 3 {
        return None;
    }
    let x = record.get(0)?.parse::<f64>().ok()?;
    let y = record.get(1)?.parse::<f64>().ok()?;
    let thickness = record.get(2)?.parse::<f64>().ok()?;
    Some(Sample { x, y, thickness })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_csv_with_header() {
        let (_dir, path) = write_temp(
            "wafer.csv",
            "X_mm,Y_mm,Thk_nm\n0.0,0.0,50.1\n10.0,0.0,49.8\n0.0,10.0,50.4\n",
        );
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.columns, ["X_mm".to_string(), "Y_mm".to_string(), "Thk_nm".to_string()]);
        assert_eq!(ds.samples[1].x, 10.0);
    }

    #[test]
    fn loads_headerless_csv_with_default_columns() {
        let (_dir, path) = write_temp("wafer.csv", "0,0,50\n1,0,51\n0,1,49\n");
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.columns, WaferDataset::default_columns());
    }

    #[test]
    fn loads_tab_separated_txt() {
        let (_dir, path) = write_temp("wafer.txt", "0\t0\t50\n1\t0\t51\n0\t1\t49\n");
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn skips_malformed_rows_and_extra_columns() {
        let (_dir, path) = write_temp(
            "wafer.csv",
            "x,y,thickness,operator\n0,0,50,alice\nbad,row,here\n1,0,51,bob\n0,1,49,carol\n",
        );
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn rejects_too_few_valid_rows() {
        let (_dir, path) = write_temp("wafer.csv", "x,y,thickness\n0,0,50\n1,0,51\n");
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = write_temp("wafer.xlsx", "0,0,50\n");
        assert!(load_file(&path).is_err());
    }
}
