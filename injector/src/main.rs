use anyhow::{Context, bail};
use catalog::models::{DatasetQuery, parse_tiers};
use catalog::{ApiClient, HttpCatalog};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use common::config::Settings;
use injector::{CommandInjector, DatasetSource, InjectOptions, run_injection};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

fn cli() -> Command {
    Command::new("ddm-inject")
        .version("1.0")
        .about(
            "Requests additional replicas for datasets registered in the catalog. \
             The dataset size passed to the injector is the total dataset size, \
             not only the part produced in the selected run.",
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
            Arg::new("list")
                .short('l')
                .long("list")
                .value_name("FILE")
                .conflicts_with("run")
                .help("File with one dataset per line, e.g. a list written by ddm-availability"),
        )
        .arg(
            Arg::new("injector")
                .short('i')
                .long("injector")
                .value_name("PATH")
                .help("Full path to the injector program [config: injector.path]"),
        )
        .arg(
            Arg::new("copies")
                .short('n')
                .long("copies")
                .value_name("NUMBER")
                .value_parser(value_parser!(u32))
                .help("Number of copies to subscribe [config default: 4]"),
        )
        .arg(
            Arg::new("exec")
                .long("exec")
                .action(ArgAction::SetTrue)
                .help("Tell the injector to execute the subscription. By default a dry run is performed."),
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

fn inject_options(matches: &ArgMatches, settings: &Settings) -> anyhow::Result<InjectOptions> {
    let source = if let Some(list) = matches.get_one::<String>("list") {
        DatasetSource::ListFile(PathBuf::from(list))
    } else {
        let Some(run) = matches.get_one::<u64>("run") else {
            bail!("need either a run number or a dataset list file");
        };
        let tiers = parse_tiers(
            matches
                .get_one::<String>("tier")
                .map(String::as_str)
                .unwrap_or_default(),
        );
        if tiers.is_empty() {
            bail!("specify data tiers when selecting datasets by run");
        }
        DatasetSource::Catalog {
            query: DatasetQuery::Run(*run),
            tiers,
        }
    };

    Ok(InjectOptions {
        source,
        copies: matches
            .get_one::<u32>("copies")
            .copied()
            .unwrap_or(settings.injector.copies),
        execute: matches.get_flag("exec"),
        retry_delay: Duration::from_secs(settings.injector.retry_delay_secs),
    })
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/ddm.toml");
    let settings = Settings::new(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    let options = inject_options(&matches, &settings)?;

    let program = matches
        .get_one::<String>("injector")
        .cloned()
        .unwrap_or_else(|| settings.injector.path.clone());
    let injector = CommandInjector::new(&program);
    let catalog = HttpCatalog::reader(ApiClient::new(&settings)?, &settings.catalog.reader_url);

    let summary = run_injection(&catalog, &injector, &options)
        .await
        .context("replica injection aborted")?;
    println!(
        "Requested replicas for {} datasets, skipped {}",
        summary.injected.len(),
        summary.skipped.len()
    );
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
