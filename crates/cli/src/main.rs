mod echo;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use pagemark_core::{
    CaptureRequest, ConversionOptions, ExtractionFallbackChain, FallbackOutcome, FetchConfig, FrontmatterConfig,
    FrontmatterStyle, InjectionStage, MessagingStage, PageAgent, PageSnapshot, Pipeline, RuleEngine, StaticPage,
    fetch_file, fetch_stdin, fetch_url, render_document,
};
use tracing_subscriber::EnvFilter;
use url::Url;

use echo::{format_size, print_banner, print_detail, print_error, print_info, print_step, print_success, print_warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the captured page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Markdown,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: markdown, json", s)),
        }
    }
}

/// Frontmatter syntax for Markdown output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StyleArg(FrontmatterStyle);

impl FromStr for StyleArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self(FrontmatterStyle::Yaml)),
            "toml" => Ok(Self(FrontmatterStyle::Toml)),
            _ => Err(format!("Invalid frontmatter style: {}. Valid options: yaml, toml", s)),
        }
    }
}

/// Capture a web page's main content as structure-preserving Markdown
#[derive(Parser, Debug)]
#[command(name = "pagemark")]
#[command(author = "Pagemark Contributors")]
#[command(version)]
#[command(about = "Capture web pages as Markdown", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Page URL to record (default: the input URL or file location)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Page title (default: the document's <title>)
    #[arg(long, value_name = "TITLE")]
    title: Option<String>,

    /// Name of the requesting collaborator
    #[arg(long, default_value = "cli", value_name = "SOURCE")]
    source: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: OutputFormat,

    /// Omit the frontmatter block (Markdown only)
    #[arg(long)]
    no_frontmatter: bool,

    /// Frontmatter syntax (yaml, toml)
    #[arg(long, default_value = "yaml", value_name = "STYLE")]
    frontmatter_style: StyleArg,

    /// Classification tag for the frontmatter (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Bullet marker for unordered lists (-, *, +)
    #[arg(long, default_value = "-", value_name = "CHAR")]
    bullet: char,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Timeout for each capture stage in seconds
    #[arg(long, default_value = "10", value_name = "SECS")]
    stage_timeout: u64,

    /// Do not start an in-page agent; capture by injection only
    #[arg(long)]
    no_agent: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// The page URL recorded for `input` when none is given.
fn default_page_url(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        return Ok(String::new());
    }
    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok(input.to_string());
    }
    let path = fs::canonicalize(Path::new(input)).with_context(|| format!("Failed to resolve path: {}", input))?;
    Url::from_file_path(&path)
        .map(String::from)
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a file URL", path.display()))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let html = if args.input == "-" {
        if args.verbose {
            print_step(1, 3, "Reading from stdin");
        }
        fetch_stdin().context("Failed to read from stdin")?
    } else if args.input.starts_with("http://") || args.input.starts_with("https://") {
        if args.verbose {
            print_step(1, 3, &format!("Fetching from {}", args.input.bright_white().underline()));
        }
        let mut config = FetchConfig { timeout: args.timeout, ..Default::default() };
        if let Some(user_agent) = &args.user_agent {
            config.user_agent = user_agent.clone();
        }
        fetch_url(&args.input, &config).await.context("Failed to fetch URL")?
    } else {
        if args.verbose {
            print_step(1, 3, &format!("Reading from file {}", args.input.bright_white()));
        }
        fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
    };

    let page_url = match &args.url {
        Some(url) => url.clone(),
        None => default_page_url(&args.input)?,
    };
    let snapshot = match &args.title {
        Some(title) => PageSnapshot::new(page_url.as_str(), title.as_str(), html),
        None => PageSnapshot::from_html(page_url.as_str(), html),
    };

    if args.verbose {
        print_detail("Size", &format_size(snapshot.raw_html().len()));
        if !snapshot.title().is_empty() {
            print_detail("Title", snapshot.title());
        }
        eprintln!();
        print_step(2, 3, "Capturing main content");
    }

    let options = ConversionOptions::builder().bullet_marker(args.bullet).build();
    let pipeline = Arc::new(Pipeline::builder().engine(RuleEngine::new(options)).build());

    let mut builder = ExtractionFallbackChain::builder().stage_timeout(Duration::from_secs(args.stage_timeout));
    if !args.no_agent {
        let (link, _agent) = PageAgent::spawn(snapshot.clone(), Arc::clone(&pipeline));
        builder = builder.messaging(MessagingStage::new(link));
    }
    let page = StaticPage::new(snapshot.clone());
    let chain = builder.injection(InjectionStage::new(Arc::new(page), pipeline)).build();

    let request = CaptureRequest::new(page_url.as_str(), snapshot.title(), args.source.as_str());
    let outcome = chain.capture(&request).await;

    match &outcome {
        FallbackOutcome::Success(result) if args.verbose => {
            for warning in &result.warnings {
                print_warning(warning);
            }
        }
        FallbackOutcome::Degraded { reason, .. } => {
            print_warning(&format!("Captured title and URL only: {}", reason));
        }
        _ => {}
    }

    if args.verbose {
        eprintln!();
        print_step(3, 3, "Writing output");
        print_detail("Format", &format!("{:?}", args.format));
        eprintln!();
    }

    let output = match (args.format, &outcome) {
        (OutputFormat::Json, _) => {
            let json = serde_json::to_string_pretty(&outcome.to_response()).context("Failed to serialize response")?;
            format!("{}\n", json)
        }
        (OutputFormat::Markdown, FallbackOutcome::Failed(failure)) => {
            print_error(&failure.message);
            anyhow::bail!("Capture failed ({:?})", failure.kind);
        }
        (OutputFormat::Markdown, FallbackOutcome::Success(result) | FallbackOutcome::Degraded { result, .. }) => {
            let config = FrontmatterConfig {
                include_frontmatter: !args.no_frontmatter,
                style: args.frontmatter_style.0,
                tags: if args.tags.is_empty() { FrontmatterConfig::default().tags } else { args.tags.clone() },
            };
            render_document(&result.markdown, &snapshot, &config).context("Failed to render document")?
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => print!("{}", output),
    }

    if let FallbackOutcome::Failed(failure) = &outcome {
        anyhow::bail!("Capture failed ({:?}): {}", failure.kind, failure.message);
    }

    Ok(())
}
