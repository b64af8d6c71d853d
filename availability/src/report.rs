use crate::summary::RunSummary;
use catalog::models::ReplicaRecord;
use common::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Names of the files produced by one consistency check run.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    prefix: PathBuf,
}

impl ReportPaths {
    pub fn new(report_dir: &Path, period: &str, date: &str, tiers: &[String]) -> Self {
        let name = format!("consistency_check-{}-{}-{}", period, date, tiers.join("_"));
        Self {
            prefix: report_dir.join(name),
        }
    }

    pub fn log(&self) -> PathBuf {
        self.with_suffix(".log")
    }

    pub fn not_cataloged(&self) -> PathBuf {
        self.with_suffix("-not_in_transfer_service.txt")
    }

    pub fn missing_data(&self, lost_threshold: f64) -> PathBuf {
        self.with_suffix(&format!("-above_{:.0}-below_100.txt", lost_threshold))
    }

    pub fn lost(&self, lost_threshold: f64) -> PathBuf {
        self.with_suffix(&format!("-below_{:.0}.txt", lost_threshold))
    }

    pub fn warning(&self) -> PathBuf {
        self.with_suffix("-warning.txt")
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut path = self.prefix.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }
}

/// Plain-text detail log of a run.
pub struct RunLog<W: Write> {
    out: W,
}

impl RunLog<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> RunLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

pub fn format_replica_line(replica: &ReplicaRecord) -> String {
    let fraction = match replica.percent_complete {
        Some(percent) => format!("{}", percent),
        None => "None".to_string(),
    };
    let created = replica
        .created_at_utc()
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "node: {:<20} fraction: {:<3}%  custodial: {:1} group {:<20} created {}",
        replica.location,
        fraction,
        if replica.is_custodial { "y" } else { "n" },
        replica.owner_group,
        created
    )
}

pub fn write_dataset_list(path: &Path, datasets: &[&str]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for dataset in datasets {
        writeln!(out, "{}", dataset)?;
    }
    out.flush()?;
    Ok(())
}

/// Prints the per-list counts and writes every non-empty list to its file.
/// Returns the files written.
pub fn write_reports(
    summary: &RunSummary,
    paths: &ReportPaths,
    lost_threshold: f64,
) -> Result<Vec<PathBuf>> {
    let not_cataloged: Vec<&str> = summary.not_cataloged.iter().map(String::as_str).collect();
    let missing = summary.missing_data();
    let lost: Vec<&str> = summary.lost.iter().map(String::as_str).collect();
    let at_risk = summary.at_risk();

    println!(
        "Number of valid datasets registered in the catalog missing in the transfer service: {}",
        not_cataloged.len()
    );
    println!(
        "Number of datasets with missing data (not complete, but above {}%): {}",
        lost_threshold,
        missing.len()
    );
    println!(
        "Number of datasets that are lost (no copy with greater than {}% availability): {}",
        lost_threshold,
        lost.len()
    );
    println!(
        "Number of datasets that can disappear (no complete copy under the custodial owner group): {}",
        at_risk.len()
    );
    if !summary.recent.is_empty() {
        println!("Number of datasets skipped as recently subscribed: {}", summary.recent.len());
    }
    if !summary.failed.is_empty() {
        println!("Number of datasets that could not be checked: {}", summary.failed.len());
    }

    let mut written = Vec::new();
    for (path, list) in [
        (paths.not_cataloged(), not_cataloged),
        (paths.missing_data(lost_threshold), missing),
        (paths.lost(lost_threshold), lost),
        (paths.warning(), at_risk),
    ] {
        if list.is_empty() {
            continue;
        }
        write_dataset_list(&path, &list)?;
        info!(path = %path.display(), datasets = list.len(), "Wrote report");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_report_paths() {
        let paths = ReportPaths::new(
            Path::new("reports"),
            "Run2015C",
            "2015-09-01",
            &["AOD".to_string(), "RAW".to_string()],
        );

        assert_eq!(
            paths.log(),
            PathBuf::from("reports/consistency_check-Run2015C-2015-09-01-AOD_RAW.log")
        );
        assert_eq!(
            paths.missing_data(90.0),
            PathBuf::from("reports/consistency_check-Run2015C-2015-09-01-AOD_RAW-above_90-below_100.txt")
        );
        assert_eq!(
            paths.lost(90.0),
            PathBuf::from("reports/consistency_check-Run2015C-2015-09-01-AOD_RAW-below_90.txt")
        );
        assert_eq!(
            paths.warning(),
            PathBuf::from("reports/consistency_check-Run2015C-2015-09-01-AOD_RAW-warning.txt")
        );
    }

    #[test]
    fn test_format_replica_line() {
        let replica = ReplicaRecord {
            location: "T2_CH_CERN".to_string(),
            percent_complete: Some(100.0),
            is_custodial: true,
            owner_group: "AnalysisOps".to_string(),
            created_at: 1_436_000_000.0,
        };
        let line = format_replica_line(&replica);
        assert!(line.ends_with("created 2015-07-04"));
        assert!(line.starts_with("node: T2_CH_CERN "));
        assert!(line.contains("fraction: 100%"));
        assert!(line.contains("custodial: y"));
        assert!(line.contains("group AnalysisOps"));

        let empty = ReplicaRecord {
            percent_complete: None,
            is_custodial: false,
            ..replica
        };
        assert!(format_replica_line(&empty).contains("fraction: None%"));
    }

    #[test]
    fn test_write_reports_skips_empty_lists() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ReportPaths::new(dir.path(), "254833", "2015-09-01", &["RAW".to_string()]);

        let summary = RunSummary {
            checked: 3,
            no_complete_copy: vec!["/A/lost/RAW".to_string(), "/B/partial/RAW".to_string()],
            lost: vec!["/A/lost/RAW".to_string()],
            owner_group_risk: vec!["/A/lost/RAW".to_string()],
            healthy: vec!["/C/fine/RAW".to_string()],
            ..RunSummary::default()
        };

        let written = write_reports(&summary, &paths, 90.0).unwrap();
        assert_eq!(written, vec![paths.missing_data(90.0), paths.lost(90.0)]);

        assert_eq!(fs::read_to_string(paths.missing_data(90.0)).unwrap(), "/B/partial/RAW\n");
        assert_eq!(fs::read_to_string(paths.lost(90.0)).unwrap(), "/A/lost/RAW\n");
        assert!(!paths.warning().exists());
        assert!(!paths.not_cataloged().exists());
    }

    #[test]
    fn test_run_log_lines() {
        let mut log = RunLog::new(Vec::new());
        log.line("Number of datasets to check: 2").unwrap();
        log.line("").unwrap();
        let bytes = log.finish().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "Number of datasets to check: 2\n\n");
    }
}
