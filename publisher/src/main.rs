use anyhow::{Context, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use common::config::Settings;
use publisher::files::collect_candidates;
use publisher::{PublicationOutcome, PublishOptions, publish};
use std::path::Path;
use std::process;

fn cli() -> Command {
    Command::new("ddm-publish")
        .version("1.0")
        .about("Publishes files into the catalog as a new dataset version")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .default_value("config/ddm.toml")
                .help("Sets a custom config file"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .value_name("FILES")
                .help("Comma separated list of logical file names"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("PATH")
                .help("File with one logical file name per line"),
        )
        .arg(
            Arg::new("primary")
                .short('p')
                .long("primary")
                .value_name("NAME")
                .help("Primary dataset name [default: taken from the file names]"),
        )
        .arg(
            Arg::new("campaign")
                .short('c')
                .long("campaign")
                .value_name("NAME")
                .help("Acquisition era [config: publication.campaign]"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .value_name("TEXT")
                .help("Processing string [config: publication.info]"),
        )
        .arg(
            Arg::new("tier")
                .short('t')
                .long("tier")
                .value_name("TIER")
                .help("Data tier [config: publication.tier]"),
        )
        .arg(
            Arg::new("dataset")
                .short('d')
                .long("dataset")
                .value_name("NAME")
                .help("Full dataset name, overrides the generated one"),
        )
        .arg(
            Arg::new("release")
                .long("release")
                .value_name("VERSION")
                .help("Software release [config: publication.release, env: CMSSW_VERSION]"),
        )
        .arg(
            Arg::new("publish")
                .long("publish")
                .action(ArgAction::SetTrue)
                .help("Write to the catalog. By default a dry run is performed."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Show debugging information and the block to be inserted"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit diagnostics as JSON"),
        )
}

fn string_or(matches: &ArgMatches, name: &str, fallback: &str) -> String {
    matches
        .get_one::<String>(name)
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

fn publish_options(matches: &ArgMatches, settings: &Settings) -> anyhow::Result<PublishOptions> {
    let list = matches.get_one::<String>("list").map(String::as_str);
    let file = matches.get_one::<String>("file").map(Path::new);
    if list.is_none() && file.is_none() {
        bail!("give the files to publish with --list and/or --file");
    }
    let files = collect_candidates(list, file).context("failed to read the file list")?;

    let publication = &settings.publication;
    let release = string_or(matches, "release", &publication.release);
    if release.is_empty() {
        bail!("software release unknown, use --release or set CMSSW_VERSION");
    }

    Ok(PublishOptions {
        files,
        primary: matches.get_one::<String>("primary").cloned(),
        dataset: matches.get_one::<String>("dataset").cloned(),
        campaign: string_or(matches, "campaign", &publication.campaign),
        info: string_or(matches, "info", &publication.info),
        tier: string_or(matches, "tier", &publication.tier),
        release,
        origin_site: publication.origin_site.clone(),
        publish: matches.get_flag("publish"),
        verbose: matches.get_flag("verbose"),
    })
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/ddm.toml");
    let settings = Settings::new(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    let options = publish_options(&matches, &settings)?;

    match publish(&settings, &options).await.context("publication failed")? {
        PublicationOutcome::Published {
            dataset,
            published,
            revalidated,
        } => println!(
            "Published {} files and revalidated {} files in {}",
            published, revalidated, dataset
        ),
        PublicationOutcome::DryRun { .. } | PublicationOutcome::UpToDate { .. } => {}
    }
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
