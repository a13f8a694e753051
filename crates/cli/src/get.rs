//! The `get` subcommand: one concurrent transfer per URL.

use std::process::ExitCode;

use anyhow::Context;
use indicatif::MultiProgress;
use tracing::debug;
use xdcc_proxy::Dialer;
use xdcc_transfer::{channel, run_transfer, Config, FileRef, TransferEvent};

use crate::args::{GetArgs, OutputFormat};
use crate::output::{
    dispatch, emit_event, CliFormatter, JsonlEvent, JsonlFormatter, TransferOutputFormatter,
};

pub async fn run(args: GetArgs) -> anyhow::Result<ExitCode> {
    let format = OutputFormat::from_flag(&args.format);

    // Pre-flight: a bad proxy URL fails the whole invocation up front.
    let dialer = Dialer::new(args.proxy.as_deref()).context("failed to initialize proxy")?;

    let mut urls = args.urls.clone();
    if let Some(path) = &args.input_list {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read URL list {}", path.display()))?;
        urls.extend(url_list_lines(&contents));
    }
    anyhow::ensure!(
        !urls.is_empty(),
        "no URLs given (pass them as arguments or with -i)"
    );

    let multi = MultiProgress::new();
    let mut handles = Vec::new();
    let mut parse_failures = 0u32;

    for url in urls {
        let file = match FileRef::parse(&url) {
            Ok(file) => file,
            Err(e) => {
                parse_failures += 1;
                match format {
                    OutputFormat::Jsonl => {
                        emit_event(JsonlEvent::parse_error(&url, "invalid IRC URL"))
                    }
                    OutputFormat::Cli => eprintln!("{e}"),
                }
                continue;
            }
        };

        let config = Config {
            file,
            out_dir: args.out_dir.clone(),
            ssl_only: args.ssl_only,
            sanitize_filenames: args.sanitize_filenames,
        };
        let formatter: Box<dyn TransferOutputFormatter + Send> = match format {
            OutputFormat::Cli => Box::new(CliFormatter::new(&multi)),
            OutputFormat::Jsonl => Box::new(JsonlFormatter::new()),
        };
        handles.push(tokio::spawn(run_one(config, dialer.clone(), formatter)));
    }

    let total = handles.len() as u32;
    let mut successful = 0u32;
    let mut failed = 0u32;
    for handle in handles {
        match handle.await {
            Ok(true) => successful += 1,
            _ => failed += 1,
        }
    }
    debug!(total, successful, failed, "batch done");

    if format == OutputFormat::Jsonl {
        emit_event(JsonlEvent::finished(total, successful, failed));
        // The stream was fully produced; individual failures are in-band.
        return Ok(ExitCode::SUCCESS);
    }

    if parse_failures > 0 || failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Drives one transfer to its terminal event. Returns completion success.
async fn run_one(
    config: Config,
    dialer: Dialer,
    mut formatter: Box<dyn TransferOutputFormatter + Send>,
) -> bool {
    let (tx, mut rx) = channel();
    let worker = tokio::spawn(run_transfer(config, dialer, tx));

    let mut success = false;
    while let Some(event) = rx.recv().await {
        dispatch(formatter.as_mut(), &event);
        match event {
            TransferEvent::Completed { .. } => {
                success = true;
                break;
            }
            TransferEvent::Aborted { .. } => break,
            TransferEvent::Error { fatal: true, .. } => break,
            _ => {}
        }
    }

    let _ = worker.await;
    success
}

fn url_list_lines(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_list_skips_blank_lines_and_trims() {
        let contents = "irc://a/c/b/1\n\n  irc://a/c/b/2  \n\t\n";
        let urls: Vec<String> = url_list_lines(contents).collect();
        assert_eq!(urls, vec!["irc://a/c/b/1", "irc://a/c/b/2"]);
    }
}
