use clap::Parser;
use console::style;
use env_logger::Env;
use linkward::cli::{Args, OutputFormat};
use linkward::reporter::{write_json, TextReporter};
use linkward::trust::DomainSet;
use linkward::ui::ScanProgress;
use linkward::{prepare_target, EngineConfig, LinkwardError, RiskEngine, ScanResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Exit status when at least one input could not be scanned
const EXIT_INVALID_INPUT: i32 = 2;

fn build_engine(args: &Args) -> Result<RiskEngine, LinkwardError> {
    let mut trusted = if args.no_builtin_allowlist {
        DomainSet::default()
    } else {
        DomainSet::builtin_trusted()
    };
    if let Some(path) = &args.allowlist {
        trusted.extend(DomainSet::load(path)?);
    }
    let threats = match &args.threatlist {
        Some(path) => DomainSet::load(path)?,
        None => DomainSet::default(),
    };
    log::debug!("{} trusted, {} threat domains", trusted.len(), threats.len());

    Ok(RiskEngine::new(EngineConfig::from_args(args))?
        .with_trust(Arc::new(trusted))
        .with_threats(Arc::new(threats)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let log_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    log::debug!("linkward starting with args: {:?}", args);

    let engine = Arc::new(build_engine(&args)?);
    let concurrency = if args.concurrency == 0 {
        num_cpus::get()
    } else {
        args.concurrency
    };

    let hide_progress = args.quiet || args.format == OutputFormat::Json;
    let progress = Arc::new(ScanProgress::new(args.urls.len() as u64, hide_progress));
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut invalid = 0usize;
    let mut tasks = JoinSet::new();

    for (index, raw) in args.urls.iter().enumerate() {
        let target = match prepare_target(raw) {
            Ok(url) => url,
            Err(e) => {
                log::error!("{}", e);
                progress.completed();
                invalid += 1;
                continue;
            }
        };

        let engine = Arc::clone(&engine);
        let progress = Arc::clone(&progress);
        let permits = Arc::clone(&permits);
        let input = raw.trim().to_string();

        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| LinkwardError::external("scan scheduler", e.to_string()))?;
            progress.started(target.as_str());
            let scanned = engine.scan(target.as_str()).await;
            progress.completed();

            scanned.map(|mut result| {
                result.input_url = input;
                (index, result)
            })
        });
    }

    let mut results: Vec<(usize, ScanResult)> = Vec::with_capacity(args.urls.len());
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(LinkwardError::from) {
            Ok(Ok(entry)) => results.push(entry),
            Ok(Err(e)) | Err(e) => {
                log::error!("{}", e);
                invalid += 1;
            }
        }
    }
    progress.finish();
    results.sort_by_key(|(index, _)| *index);
    let results: Vec<ScanResult> = results.into_iter().map(|(_, r)| r).collect();

    match args.format {
        OutputFormat::Json => write_json(&results, args.output.as_deref())?,
        OutputFormat::Text => {
            let reporter = TextReporter::new();
            println!();
            for result in &results {
                println!("{}", reporter.render(result));
            }
            if let Some(path) = args.output.as_deref() {
                write_json(&results, Some(path))?;
            }

            let flagged = results.iter().filter(|r| r.score >= 50).count();
            println!(
                "    {} {} scanned, {} high risk, {} invalid",
                style("▶").cyan(),
                style(results.len()).white().bold(),
                style(flagged).red().bold(),
                style(invalid).yellow()
            );
        }
    }

    if invalid > 0 {
        std::process::exit(EXIT_INVALID_INPUT);
    }
    Ok(())
}
