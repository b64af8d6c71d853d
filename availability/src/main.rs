use anyhow::{Context, bail};
use availability::{CheckOptions, run_availability_check};
use catalog::models::{DatasetQuery, parse_tiers};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use common::config::Settings;
use std::path::PathBuf;
use std::process;

fn cli() -> Command {
    Command::new("ddm-availability")
        .version("1.0")
        .about(
            "Finds datasets in valid state in the catalog that are effectively \
             not available according to the subscription information of the \
             transfer service.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .default_value("config/ddm.toml")
                .help("Sets a custom config file"),
        )
        .arg(
            Arg::new("tier")
                .short('t')
                .long("tier")
                .value_name("LIST")
                .required(true)
                .help("Comma separated list of data tiers without whitespaces"),
        )
        .arg(
            Arg::new("run")
                .short('r')
                .long("run")
                .value_name("NUMBER")
                .value_parser(value_parser!(u64))
                .help("Run number"),
        )
        .arg(
            Arg::new("era")
                .short('e')
                .long("era")
                .value_name("TEXT")
                .help("Check all datasets of a production era, e.g. 'Run2015C'"),
        )
        .arg(
            Arg::new("ignore")
                .short('i')
                .long("ignore")
                .value_name("DAYS")
                .value_parser(value_parser!(f64))
                .help("Ignore datasets first subscribed within the last N days [config default: 7]"),
        )
        .arg(
            Arg::new("lost")
                .short('l')
                .long("lost")
                .value_name("PERCENT")
                .value_parser(value_parser!(f64))
                .help("Completeness at or below which a replica counts as lost [config default: 90]"),
        )
        .arg(
            Arg::new("owner-group")
                .short('g')
                .long("owner-group")
                .value_name("GROUP")
                .help("Group expected to hold a complete copy [config default: AnalysisOps]"),
        )
        .arg(
            Arg::new("report-dir")
                .long("report-dir")
                .value_name("DIR")
                .help("Directory for the log and list files [config default: reports]"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Show debugging information"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit diagnostics as JSON"),
        )
}

fn check_options(matches: &ArgMatches, settings: &Settings) -> anyhow::Result<CheckOptions> {
    let query = if let Some(era) = matches.get_one::<String>("era") {
        DatasetQuery::Era(era.clone())
    } else if let Some(run) = matches.get_one::<u64>("run") {
        DatasetQuery::Run(*run)
    } else {
        bail!("need either a run number or an era name");
    };

    let tiers = parse_tiers(
        matches
            .get_one::<String>("tier")
            .map(String::as_str)
            .unwrap_or_default(),
    );
    if tiers.is_empty() {
        bail!("specify at least one data tier");
    }

    let defaults = &settings.availability;
    let lost_threshold = matches
        .get_one::<f64>("lost")
        .copied()
        .unwrap_or(defaults.lost_threshold);
    if !(0.0..100.0).contains(&lost_threshold) {
        bail!("lost threshold must be in [0, 100), got {}", lost_threshold);
    }

    Ok(CheckOptions {
        query,
        tiers,
        lost_threshold,
        grace_days: matches
            .get_one::<f64>("ignore")
            .copied()
            .unwrap_or(defaults.grace_days),
        custodial_owner_group: matches
            .get_one::<String>("owner-group")
            .cloned()
            .unwrap_or_else(|| defaults.custodial_owner_group.clone()),
        report_dir: PathBuf::from(
            matches
                .get_one::<String>("report-dir")
                .cloned()
                .unwrap_or_else(|| defaults.report_dir.clone()),
        ),
    })
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/ddm.toml");
    let settings = Settings::new(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    let options = check_options(&matches, &settings)?;

    run_availability_check(&settings, &options)
        .await
        .context("availability check failed")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    common::logging::init_tracing(matches.get_flag("verbose"), matches.get_flag("json-logs"));

    if let Err(e) = run(matches).await {
        eprintln!("ERROR: {:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CheckOptions> {
        let matches = cli().try_get_matches_from(args)?;
        check_options(&matches, &Settings::default())
    }

    #[test]
    fn test_era_wins_over_run() {
        let options = parse(&[
            "ddm-availability",
            "-t",
            "AOD,RAW",
            "-r",
            "254833",
            "-e",
            "Run2015C",
        ])
        .unwrap();
        assert_eq!(options.query, DatasetQuery::Era("Run2015C".to_string()));
        assert_eq!(options.tiers, vec!["AOD", "RAW"]);
    }

    #[test]
    fn test_flags_override_settings() {
        let options = parse(&[
            "ddm-availability", "-t", "RAW", "-r", "254833", "-l", "80", "-i", "0", "-g", "DataOps",
            "--report-dir", "/tmp/out",
        ])
        .unwrap();
        assert_eq!(options.query, DatasetQuery::Run(254833));
        assert_eq!(options.lost_threshold, 80.0);
        assert_eq!(options.grace_days, 0.0);
        assert_eq!(options.custodial_owner_group, "DataOps");
        assert_eq!(options.report_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_defaults_come_from_settings() {
        let options = parse(&["ddm-availability", "-t", "RAW", "-r", "1"]).unwrap();
        assert_eq!(options.lost_threshold, 90.0);
        assert_eq!(options.grace_days, 7.0);
        assert_eq!(options.custodial_owner_group, "AnalysisOps");
        assert_eq!(options.report_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_invalid_invocations() {
        assert!(parse(&["ddm-availability", "-t", "RAW"]).is_err());
        assert!(parse(&["ddm-availability", "-r", "1"]).is_err());
        assert!(parse(&["ddm-availability", "-t", ",", "-r", "1"]).is_err());
        assert!(parse(&["ddm-availability", "-t", "RAW", "-r", "1", "-l", "100"]).is_err());
    }
}
