use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::output::{self, OutputFormat};
use crate::service::{HttpValidationService, ServiceOptions, ValidationService};
use crate::session::{Outcome, Session};

/// How a run ended, for the process exit status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    InvalidFound,
}

fn print_banner() {
    const BANNER: &str = r#"
    _                 _
   (_)_ ____   _____ (_) ___ ___        __ _  ___
   | | '_ \ \ / / _ \| |/ __/ _ \_____ / _` |/ __|
   | | | | \ V / (_) | | (_|  __/_____| (_| | (__
   |_|_| |_|\_/ \___/|_|\___\___|      \__, |\___|
                                          |_|
"#;
    print!("{}", BANNER);
    println!("       v{} - invoice QC validation client", env!("CARGO_PKG_VERSION"));
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');
    if let Some(long_about) = cmd.get_long_about().or(cmd.get_about()) {
        out.push_str(&long_about.to_string());
        out.push('\n');
    }
    out.push_str("\nUsage: ");
    out.push_str(cmd.get_name());
    out.push_str(" [OPTIONS]\n\n");

    let mut headings: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<&clap::Arg>> = HashMap::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options").to_string();
        if !grouped.contains_key(&heading) {
            headings.push(heading.clone());
        }
        grouped.entry(heading).or_default().push(arg);
    }

    for heading in headings {
        out.push_str(&heading);
        out.push_str(":\n");
        for arg in grouped.get(&heading).into_iter().flatten() {
            let mut flags: Vec<String> = Vec::new();
            if let Some(short) = arg.get_short() {
                flags.push(format!("-{short}"));
            }
            if let Some(long) = arg.get_long() {
                flags.push(format!("--{long}"));
            }
            for alias in arg.get_visible_aliases().unwrap_or_default() {
                let rendered = format!("--{alias}");
                if !flags.contains(&rendered) {
                    flags.push(rendered);
                }
            }
            let mut line = flags.join(", ");
            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                let optional = arg.get_num_args().map(|r| r.min_values() == 0).unwrap_or(false);
                if optional {
                    line.push_str(&format!(" [<{value_name}>]"));
                } else {
                    line.push_str(&format!(" <{value_name}>"));
                }
            }
            out.push_str("  ");
            out.push_str(&line);
            out.push('\n');
            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }
            out.push('\n');
        }
    }

    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Input {
    Pdfs(Vec<String>),
    JsonFile(String),
    JsonText(String),
    HealthOnly,
}

#[derive(Clone, Debug)]
struct RunConfig {
    input: Input,
    service: ServiceOptions,
    output: Option<String>,
    output_format: Option<OutputFormat>,
    invalid_only: bool,
    summary: bool,
    fail_on_invalid: bool,
    quiet: bool,
    verbose: u8,
    no_color: bool,
    health: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let base_url = args
        .url
        .or(cfg.base_url)
        .unwrap_or_else(|| crate::service::DEFAULT_BASE_URL.to_string());
    let timeout_seconds = args
        .timeout
        .or(cfg.timeout)
        .unwrap_or(crate::service::DEFAULT_TIMEOUT_SECONDS);
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => Some(
            OutputFormat::parse(&raw)
                .ok_or_else(|| format!("invalid output format '{raw}'"))?,
        ),
        None => output.as_deref().and_then(output::infer_format_from_path),
    };

    let input = if !args.pdf.is_empty() {
        Input::Pdfs(
            args.pdf
                .iter()
                .map(|p| config::expand_tilde_string(p.trim()))
                .collect(),
        )
    } else if let Some(path) = args.json {
        if path.trim() == "-" {
            Input::JsonFile("-".to_string())
        } else {
            Input::JsonFile(config::expand_tilde_string(path.trim()))
        }
    } else if let Some(text) = args.json_text {
        Input::JsonText(text)
    } else {
        Input::HealthOnly
    };

    Ok(RunConfig {
        input,
        service: ServiceOptions {
            base_url,
            timeout_seconds,
            proxy,
        },
        output,
        output_format,
        invalid_only: args.invalid_only.or(cfg.invalid_only).unwrap_or(false),
        summary: args.summary.or(cfg.summary).unwrap_or(true),
        fail_on_invalid: args
            .fail_on_invalid
            .or(cfg.fail_on_invalid)
            .unwrap_or(false),
        quiet: args.quiet,
        verbose: args.verbose,
        no_color,
        health: args.health,
    })
}

/// Expands directories to the `.pdf` files directly inside them, sorted by
/// name. Plain paths are passed through untouched.
pub async fn collect_pdfs(paths: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut out = Vec::new();
    for raw in paths {
        let path = PathBuf::from(raw);
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            out.push(path);
            continue;
        }
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| format!("failed to read directory '{}': {e}", path.display()))?;
        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| format!("failed to read directory '{}': {e}", path.display()))?
        {
            let candidate = entry.path();
            let is_pdf = candidate
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
            if !is_pdf {
                continue;
            }
            let is_file = tokio::fs::metadata(&candidate)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file {
                found.push(candidate);
            }
        }
        found.sort();
        out.extend(found);
    }
    Ok(out)
}

async fn read_json_input(source: &str) -> Result<String, String> {
    if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|e| format!("failed to read JSON from stdin: {e}"))?;
        return Ok(buf);
    }
    tokio::fs::read_to_string(source)
        .await
        .map_err(|e| format!("failed to read JSON file '{source}': {e}"))
}

fn spinner(quiet: bool, message: String) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    if quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .map_err(|e| format!("invalid progress template: {e}"))?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn check_health<S: ValidationService>(service: &S, quiet: bool) -> Result<(), String> {
    let pb = spinner(quiet, "checking service health".to_string())?;
    let health = service.health().await;
    pb.finish_and_clear();
    let health = health.map_err(|e| e.to_string())?;
    if !health.is_ok() {
        return Err(format!("service reported status '{}'", health.status));
    }
    if !quiet {
        format_kv_line("Health", &health.status.green().to_string());
    }
    Ok(())
}

async fn write_output(run: &RunConfig, path: &str, rendered: &[u8]) -> Result<(), String> {
    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;
    outfile
        .write_all(rendered)
        .await
        .map_err(|e| format!("failed to write output file: {e}"))?;
    if !run.quiet {
        format_kv_line("Output", path);
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<RunStatus, String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    if !run.quiet {
        print_banner();
    }

    let service = HttpValidationService::new(&run.service).map_err(|e| e.to_string())?;

    if !run.quiet {
        format_kv_line(
            "Service",
            &format!(
                "{} timeout={}s proxy={}",
                service.base_url(),
                run.service.timeout_seconds,
                format_bool(run.service.proxy.is_some())
            ),
        );
    }

    if run.health || run.input == Input::HealthOnly {
        check_health(&service, run.quiet).await?;
        if run.input == Input::HealthOnly {
            return Ok(RunStatus::Clean);
        }
    }

    let session = Session::new(service);
    session.set_show_invalid_only(run.invalid_only).await;

    let outcome = match &run.input {
        Input::Pdfs(paths) => {
            let files = collect_pdfs(paths).await?;
            if !run.quiet {
                format_kv_line("Input", &format!("pdfs={}", files.len()));
            }
            let pb = spinner(run.quiet, format!("validating {} PDF(s)", files.len()))?;
            let outcome = session.submit_pdfs(&files).await;
            pb.finish_and_clear();
            outcome
        }
        Input::JsonFile(source) => {
            let raw = read_json_input(source).await?;
            if !run.quiet {
                format_kv_line("Input", &format!("json={source}"));
            }
            let pb = spinner(run.quiet, "validating JSON".to_string())?;
            let outcome = session.submit_json(&raw).await;
            pb.finish_and_clear();
            outcome
        }
        Input::JsonText(raw) => {
            let pb = spinner(run.quiet, "validating JSON".to_string())?;
            let outcome = session.submit_json(raw).await;
            pb.finish_and_clear();
            outcome
        }
        Input::HealthOnly => return Ok(RunStatus::Clean),
    };

    match outcome {
        Outcome::Rendered { shown, total } => {
            if !run.quiet {
                format_kv_line(
                    "Results",
                    &format!(
                        "shown={shown} total={total} filter={}",
                        if run.invalid_only { "invalid" } else { "none" }
                    ),
                );
                println!();
            }
        }
        Outcome::Rejected(notice) => return Err(notice.to_string()),
        Outcome::Failed(e) => return Err(e.to_string()),
        Outcome::Superseded => {
            return Err("response discarded, a newer submission was applied".to_string())
        }
    }

    if run.verbose > 0 {
        if let Some(raw) = session.last_response().await {
            let pretty = serde_json::to_string_pretty(&raw).unwrap_or_else(|_| raw.to_string());
            eprintln!("{} {}", "API response:".dimmed(), pretty);
        }
    }

    let rows = session.rows().await;
    let summary = session.summary().await;

    if !run.quiet {
        output::print_table(&rows);
        if run.summary {
            output::print_summary(&summary);
        }
    }

    if let Some(path) = run.output.as_ref() {
        let format = run.output_format.unwrap_or(OutputFormat::Text);
        let rendered = output::render_as(format, &rows, &summary, run.invalid_only);
        write_output(&run, path, &rendered).await?;
    }

    if run.fail_on_invalid && summary.has_invalid() {
        return Ok(RunStatus::InvalidFound);
    }
    Ok(RunStatus::Clean)
}

pub fn run_cli() -> Result<RunStatus, String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(RunStatus::Clean);
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(RunStatus::Clean);
            }
            _ => return Err(e.to_string()),
        },
    };

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));

    if args.init_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "could not determine a config path".to_string())?;
        if config::ensure_default_config_file(&path)? {
            format_kv_line("Config", &format!("written {}", path.display()));
        } else {
            format_kv_line("Config", &format!("already exists {}", path.display()));
        }
        return Ok(RunStatus::Clean);
    }

    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
