use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if args.init_config {
        return Ok(());
    }
    let sources = [
        !args.pdf.is_empty(),
        args.json.is_some(),
        args.json_text.is_some(),
    ]
    .iter()
    .filter(|s| **s)
    .count();
    if sources > 1 {
        return Err("use only one of --pdf, --json or --json-text".to_string());
    }
    if sources == 0 && !args.health {
        return Err("no input given (use --pdf, --json, --json-text or --health)".to_string());
    }
    if let Some(raw) = args.url.as_deref() {
        let parsed =
            reqwest::Url::parse(raw.trim()).map_err(|e| format!("invalid --url '{raw}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("invalid --url '{raw}': expected http or https"));
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json, xml or html"
            ));
        }
    }
    Ok(())
}
