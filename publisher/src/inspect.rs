use async_trait::async_trait;
use catalog::models::LumiSection;
use common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

static STAT_SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Size:\s*(\d+)").expect("Invalid stat size regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub size: u64,
    pub events: u64,
    pub lumis: Vec<LumiSection>,
}

/// Source of the per-file metadata recorded at publication.
#[async_trait]
pub trait FileInspector: Send + Sync {
    async fn inspect(&self, lfn: &str) -> Result<FileMetadata>;
}

/// Expected stdout of the event/lumi summary program.
#[derive(Debug, Deserialize)]
struct FileSummary {
    events: u64,
    #[serde(default)]
    lumis: Vec<LumiSection>,
}

/// Reads file metadata over XRootD: the size from `stat`, events and lumi
/// sections from an external summary program.
pub struct XrootdInspector {
    stat_command: String,
    inspect_command: String,
    redirector: String,
}

impl XrootdInspector {
    pub fn new(stat_command: &str, inspect_command: &str, redirector: &str) -> Self {
        Self {
            stat_command: stat_command.to_string(),
            inspect_command: inspect_command.to_string(),
            redirector: redirector.to_string(),
        }
    }

    pub fn file_url(&self, lfn: &str) -> String {
        format!("root://{}/{}", self.redirector, lfn)
    }

    async fn file_size(&self, lfn: &str) -> Result<u64> {
        let args = [self.redirector.as_str(), "stat", lfn];
        let output = run_capture(&self.stat_command, &args).await?;
        parse_stat_size(&output)
            .ok_or_else(|| Error::Other(format!("Failed to get file size for file {}", lfn)))
    }

    async fn file_summary(&self, lfn: &str) -> Result<FileSummary> {
        let url = self.file_url(lfn);
        let output = run_capture(&self.inspect_command, &[url.as_str()]).await?;
        serde_json::from_str(&output)
            .map_err(|e| Error::Other(format!("Failed to read events of file {}: {}", lfn, e)))
    }
}

#[async_trait]
impl FileInspector for XrootdInspector {
    async fn inspect(&self, lfn: &str) -> Result<FileMetadata> {
        let size = self.file_size(lfn).await?;
        let summary = self.file_summary(lfn).await?;
        debug!(lfn, size, events = summary.events, lumis = summary.lumis.len(), "Inspected file");
        Ok(FileMetadata {
            size,
            events: summary.events,
            lumis: summary.lumis,
        })
    }
}

pub fn parse_stat_size(output: &str) -> Option<u64> {
    STAT_SIZE_REGEX
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

async fn run_capture(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program).args(args).output().await?;
    if !output.status.success() {
        return Err(Error::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            code: output.status.code().unwrap_or(-1),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_size() {
        let output = "Path: /store/user/x/a.root\nId: 123\nSize: 104857600\nFlags: 16 (IsReadable)\n";
        assert_eq!(parse_stat_size(output), Some(104_857_600));
        assert_eq!(parse_stat_size("Size:12"), Some(12));
        assert_eq!(parse_stat_size("no such file"), None);
    }

    #[test]
    fn test_file_url() {
        let inspector = XrootdInspector::new("xrd", "edm-file-summary", "cms-xrd-global.cern.ch");
        assert_eq!(
            inspector.file_url("/store/user/x/a.root"),
            "root://cms-xrd-global.cern.ch//store/user/x/a.root"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_inspect_with_scripted_commands() {
        let dir = tempfile::tempdir().unwrap();
        let stat = dir.path().join("stat.sh");
        let summary = dir.path().join("summary.sh");
        write_script(&stat, "echo \"Path: $3\"; echo 'Size: 2048'");
        write_script(
            &summary,
            r#"echo '{"events": 500, "lumis": [{"run_num": 1, "lumi_section_num": 7}]}'"#,
        );

        let inspector = XrootdInspector::new(
            stat.to_str().unwrap(),
            summary.to_str().unwrap(),
            "cms-xrd-global.cern.ch",
        );
        let metadata = inspector.inspect("/store/user/x/a.root").await.unwrap();
        assert_eq!(metadata.size, 2048);
        assert_eq!(metadata.events, 500);
        assert_eq!(
            metadata.lumis,
            vec![LumiSection {
                run_num: 1,
                lumi_section_num: 7
            }]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_stat_is_reported() {
        let inspector = XrootdInspector::new("false", "true", "cms-xrd-global.cern.ch");
        let err = inspector.inspect("/store/user/x/a.root").await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: 1, .. }));
    }

    #[cfg(unix)]
    fn write_script(path: &std::path::Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
