use std::fs::OpenOptions;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::optimize::controller::{RoundController, Termination};
use crate::stats::ThicknessSummary;

// ---------------------------------------------------------------------------
// Campaign report – one row per finished campaign
// ---------------------------------------------------------------------------

/// Summary of a finished campaign, appended to a shared log CSV so that a
/// sweep over many wafers leaves a single auditable table.
#[derive(Debug, Clone)]
pub struct CampaignReport {
    pub source: String,
    pub termination: String,
    pub rounds: u32,
    pub outlier_rounds: u32,
    pub removed_points: usize,
    pub origin: ThicknessSummary,
    pub result: ThicknessSummary,
}

const HEADER: [&str; 17] = [
    "timestamp",
    "source",
    "termination",
    "rounds",
    "outlier_rounds",
    "removed_points",
    "origin_count",
    "origin_max_nm",
    "origin_min_nm",
    "origin_mean_nm",
    "origin_uniformity_pct",
    "final_count",
    "final_max_nm",
    "final_min_nm",
    "final_mean_nm",
    "final_uniformity_pct",
    "retention_ratio",
];

impl CampaignReport {
    /// Build a report from a finished (or stopped) controller plus the
    /// summary of the dataset it started from.
    pub fn from_campaign(
        controller: &RoundController,
        origin: ThicknessSummary,
        termination: &Termination,
    ) -> Self {
        let result = crate::stats::summarize(&controller.dataset().thickness_values());
        CampaignReport {
            source: controller.base_name().to_string(),
            termination: termination.to_string(),
            rounds: controller.ledger().current_round(),
            outlier_rounds: controller.ledger().outlier_rounds(),
            removed_points: controller.ledger().total_removed(),
            origin,
            result,
        }
    }

    /// Append this report as one row of `path`, writing the header first
    /// when the file is new or empty.
    pub fn append_to(&self, path: &Path) -> Result<()> {
        let write_header = !path.exists()
            || std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);

        if write_header {
            writer.write_record(HEADER).context("writing report header")?;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let retention = if self.origin.count == 0 {
            0.0
        } else {
            self.result.count as f64 / self.origin.count as f64
        };

        writer
            .write_record(&[
                timestamp.to_string(),
                self.source.clone(),
                self.termination.clone(),
                self.rounds.to_string(),
                self.outlier_rounds.to_string(),
                self.removed_points.to_string(),
                self.origin.count.to_string(),
                format!("{:.3}", self.origin.max),
                format!("{:.3}", self.origin.min),
                format!("{:.3}", self.origin.mean),
                format!("{:.3}", self.origin.uniformity),
                self.result.count.to_string(),
                format!("{:.3}", self.result.max),
                format!("{:.3}", self.result.min),
                format!("{:.3}", self.result.mean),
                format!("{:.3}", self.result.uniformity),
                format!("{retention:.3}"),
            ])
            .context("writing report row")?;

        writer.flush().context("flushing report")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::summarize;

    fn report() -> CampaignReport {
        CampaignReport {
            source: "w17".into(),
            termination: "converged at 4.20% uniformity".into(),
            rounds: 3,
            outlier_rounds: 2,
            removed_points: 4,
            origin: summarize(&[48.0, 50.0, 52.0, 1000.0]),
            result: summarize(&[48.0, 50.0, 52.0]),
        }
    }

    #[test]
    fn appends_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaigns.csv");

        report().append_to(&path).unwrap();
        report().append_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,source,termination"));
        assert!(lines[1].contains("w17"));
        assert!(lines[2].contains("converged"));
    }
}
