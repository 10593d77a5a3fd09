use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "invoice-qc",
    version,
    about = "invoice QC validation client",
    long_about = "invoice-qc sends PDF invoices or JSON invoice lists to the invoice QC service and renders the validation results as a table.\n\nExamples:\n  invoice-qc --pdf a.pdf --pdf b.pdf\n  invoice-qc --json invoices.json --invalid-only\n  cat invoices.json | invoice-qc --json - --out report.html\n  invoice-qc --health --url http://qc.internal:8000\n\nTip: Use --config to persist the service URL and output settings."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v prints the raw API response)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'p',
        long = "pdf",
        value_name = "FILE",
        action = ArgAction::Append,
        help_heading = "Input",
        help = "PDF invoice to upload (repeatable)."
    )]
    pub pdf: Vec<String>,

    #[arg(
        short = 'j',
        long = "js",
        visible_alias = "json",
        value_name = "FILE",
        help_heading = "Input",
        help = "JSON file to validate ('-' reads stdin)."
    )]
    pub json: Option<String>,

    #[arg(
        long = "jt",
        visible_alias = "json-text",
        value_name = "TEXT",
        help_heading = "Input",
        help = "Inline JSON to validate."
    )]
    pub json_text: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.invoice-qc/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write a default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Base URL of the validation service."
    )]
    pub url: Option<String>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "hc",
        visible_alias = "health",
        help_heading = "HTTP",
        help = "Check service health and exit."
    )]
    pub health: bool,

    #[arg(
        short = 'i',
        long = "io",
        visible_alias = "invalid-only",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "Output",
        help = "Only show invalid results."
    )]
    pub invalid_only: Option<bool>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the results table to a file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output file format: text, json, xml, html (inferred from --output by default)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'q',
        long = "qt",
        visible_alias = "quiet",
        help_heading = "Output",
        help = "Do not print the results table."
    )]
    pub quiet: bool,

    #[arg(
        short = 's',
        long = "sm",
        visible_alias = "summary",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "Output",
        help = "Print totals and the most common errors."
    )]
    pub summary: Option<bool>,

    #[arg(
        long = "foi",
        visible_alias = "fail-on-invalid",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "Output",
        help = "Exit with status 2 when any invoice is invalid."
    )]
    pub fail_on_invalid: Option<bool>,
}
