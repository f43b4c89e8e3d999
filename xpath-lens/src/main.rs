//! xpath-lens - XPath tester for XML and HTML documents
//!
//! This is the CLI entry point: evaluate an XPath expression against a file
//! or stdin, or resolve a LINE:COL click position to a synthesized XPath.

mod cli;

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::debug;

use xpath_lens_core::{
    detect_mode, resolve_click, source_utils, ClickTarget, Dispatcher, EvalRequest, Evaluation,
    ParseMode,
};

use cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "warn" }),
    )
    .init();

    if let Err(e) = run(args) {
        eprintln!("error: {:#}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Output format for evaluation results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Value,
    Count,
}

impl OutputFormat {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "value" => Some(OutputFormat::Value),
            "count" => Some(OutputFormat::Count),
            _ => None,
        }
    }

    fn valid_formats() -> Vec<&'static str> {
        vec!["text", "json", "value", "count"]
    }
}

/// Normalize XPath expression - auto-prefix with // if not starting with /
fn normalize_xpath(xpath: &str) -> String {
    if xpath.starts_with('/') || xpath.starts_with('(') || xpath == "." {
        xpath.to_string()
    } else {
        format!("//{}", xpath)
    }
}

fn read_source(file: Option<&str>) -> Result<(String, ParseMode)> {
    match file {
        Some(path) => {
            let source = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            Ok((source, detect_mode(path)))
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("reading stdin")?;
            Ok((source, ParseMode::Xml))
        }
    }
}

fn run(args: Args) -> Result<()> {
    let (source, detected) = read_source(args.file.as_deref())?;

    let mode = if args.html {
        ParseMode::Html
    } else if args.xml {
        ParseMode::Xml
    } else {
        detected
    };
    debug!("parse mode: {:?}", mode);

    // Click resolution mode: print the synthesized XPath and stop
    if let Some(ref at) = args.at {
        let (line, column) = source_utils::parse_position(at)
            .ok_or_else(|| anyhow!("invalid position '{}': use LINE:COL", at))?;
        let line_text = source_utils::line_text(&source, line)
            .ok_or_else(|| anyhow!("line {} is past the end of the input", line))?
            .to_string();

        let xpath = resolve_click(
            &source,
            mode,
            &ClickTarget {
                line,
                column,
                line_text,
                surrounding: None,
            },
        )?;
        println!("{}", xpath);
        return Ok(());
    }

    let xpath = args
        .xpath
        .as_deref()
        .map(normalize_xpath)
        .ok_or_else(|| anyhow!("an XPath expression is required: -x \"//expr\""))?;

    let format = OutputFormat::from_str(&args.output).ok_or_else(|| {
        anyhow!(
            "invalid format '{}'. Valid formats: {}",
            args.output,
            OutputFormat::valid_formats().join(", ")
        )
    })?;

    let dispatcher = match args.threshold {
        Some(threshold) => Dispatcher::with_threshold(threshold),
        None => Dispatcher::new(),
    };
    debug!(
        "dispatch: {} bytes routed {:?}",
        source.len(),
        dispatcher.route(source.len())
    );

    let mut result = dispatcher.dispatch(EvalRequest {
        content: source,
        xpath,
        mode,
    })?;
    debug!(
        "{} matches in {:.2}ms",
        result.count, result.execution_time_ms
    );

    if let Some(limit) = args.limit {
        result.matches.truncate(limit);
    }

    print_result(&result, format);
    check_expectation(result.count, args.expect.as_deref())
}

fn print_result(result: &Evaluation, format: OutputFormat) {
    match format {
        OutputFormat::Count => println!("{}", result.count),
        OutputFormat::Json => match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("error: serializing result: {}", e),
        },
        OutputFormat::Value => {
            for m in &result.matches {
                println!("{}", m.value);
            }
        }
        OutputFormat::Text => {
            for m in &result.matches {
                let value = m.value.split_whitespace().collect::<Vec<_>>().join(" ");
                match (m.start_offset, m.end_offset) {
                    (Some(start), Some(end)) => println!("{}..{}: {}", start, end, value),
                    _ => println!("?: {}", value),
                }
            }
        }
    }
}

/// Exit non-zero when the match count disagrees with --expect
fn check_expectation(count: usize, expect: Option<&str>) -> Result<()> {
    let Some(expect) = expect else {
        return Ok(());
    };

    let passed = match expect {
        "none" => count == 0,
        "some" => count > 0,
        _ => {
            let expected: usize = expect
                .parse()
                .map_err(|_| anyhow!("invalid expectation '{}': use 'none', 'some', or a number", expect))?;
            count == expected
        }
    };

    if !passed {
        bail!("expectation failed: expected {}, got {} matches", expect, count);
    }
    Ok(())
}
