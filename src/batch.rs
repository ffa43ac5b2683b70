use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Batch input discovery
// ---------------------------------------------------------------------------

/// Result of scanning a folder for campaign inputs.
#[derive(Debug, Default)]
pub struct FileSelection {
    /// One file per base dataset, highest round version, sorted by name.
    pub selected: Vec<PathBuf>,
    /// Older round versions that were passed over.
    pub skipped: Vec<PathBuf>,
}

/// Recursively collect `.csv` files under `folder`, keeping only the highest
/// processed round of each base dataset. A folder holding `w17.csv`,
/// `w17_outlier_removed.csv` and `w17_outlier_round_2.csv` yields just the
/// round-2 file; rerunning a swept folder resumes from the latest artifacts.
pub fn collect_input_files(folder: &Path) -> Result<FileSelection> {
    let mut files = Vec::new();
    walk_csv(folder, &mut files)
        .with_context(|| format!("scanning {}", folder.display()))?;

    // base name → (round → path)
    let mut versions: BTreeMap<String, BTreeMap<u32, PathBuf>> = BTreeMap::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let (base, round) = parse_round_version(stem);
        versions.entry(base).or_default().insert(round, path);
    }

    let mut selection = FileSelection::default();
    for (base, mut rounds) in versions {
        let Some((max_round, path)) = rounds.pop_last() else {
            continue;
        };
        if !rounds.is_empty() {
            log::info!(
                "{base}: using round-{max_round} file {}, skipping {} older version(s)",
                path.display(),
                rounds.len()
            );
            selection.skipped.extend(rounds.into_values());
        }
        selection.selected.push(path);
    }

    selection
        .selected
        .sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(selection)
}

fn walk_csv(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_csv(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Split a file stem into its base dataset name and reduction-round number.
/// Unrecognized stems are round 0 (an original, unprocessed file).
///
/// Round ordering across phases: a combined
/// `_error_deleted_{o}_time_min_removed_{m}` artifact counts as `o + m`
/// rounds, so it outranks every artifact of the phases it followed.
pub fn parse_round_version(stem: &str) -> (String, u32) {
    if let Some(pos) = stem.find("_error_deleted_") {
        let rest = &stem[pos + "_error_deleted_".len()..];
        if let Some((o, m)) = rest.split_once("_time_min_removed_") {
            if let (Ok(o), Ok(m)) = (o.parse::<u32>(), m.parse::<u32>()) {
                return (stem[..pos].to_string(), o + m);
            }
        }
    }
    if let Some(base) = stem.strip_suffix("_outlier_removed") {
        return (base.to_string(), 1);
    }
    if let Some(pos) = stem.find("_outlier_round_") {
        if let Ok(n) = stem[pos + "_outlier_round_".len()..].parse::<u32>() {
            return (stem[..pos].to_string(), n);
        }
    }
    if let Some(base) = stem.strip_suffix("_min_removed") {
        return (base.to_string(), 1);
    }
    if let Some(pos) = stem.find("_min_removed_") {
        if let Ok(m) = stem[pos + "_min_removed_".len()..].parse::<u32>() {
            return (stem[..pos].to_string(), m);
        }
    }
    (stem.to_string(), 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_round_versions() {
        assert_eq!(parse_round_version("w17"), ("w17".to_string(), 0));
        assert_eq!(parse_round_version("w17_outlier_removed"), ("w17".to_string(), 1));
        assert_eq!(parse_round_version("w17_outlier_round_3"), ("w17".to_string(), 3));
        assert_eq!(parse_round_version("w17_min_removed"), ("w17".to_string(), 1));
        assert_eq!(parse_round_version("w17_min_removed_4"), ("w17".to_string(), 4));
        assert_eq!(
            parse_round_version("w17_error_deleted_3_time_min_removed_2"),
            ("w17".to_string(), 5)
        );
    }

    #[test]
    fn malformed_suffixes_fall_back_to_round_zero() {
        assert_eq!(
            parse_round_version("w17_outlier_round_x"),
            ("w17_outlier_round_x".to_string(), 0)
        );
    }

    #[test]
    fn selects_highest_round_per_base() {
        let dir = tempfile::tempdir().unwrap();
        let names = [
            "w17.csv",
            "w17_outlier_removed.csv",
            "w17_outlier_round_2.csv",
            "w20.csv",
        ];
        for name in names {
            std::fs::write(dir.path().join(name), "x,y,thickness\n").unwrap();
        }

        let selection = collect_input_files(dir.path()).unwrap();
        let selected: Vec<_> = selection
            .selected
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(selected, vec!["w17_outlier_round_2.csv", "w20.csv"]);
        assert_eq!(selection.skipped.len(), 2);
    }

    #[test]
    fn walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lot_a")).unwrap();
        std::fs::write(dir.path().join("lot_a/w01.csv"), "").unwrap();
        std::fs::write(dir.path().join("w02.CSV"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let selection = collect_input_files(dir.path()).unwrap();
        assert_eq!(selection.selected.len(), 2);
    }
}
