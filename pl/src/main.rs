//! PromptLab - prompt library CLI
//!
//! CLI entry point for browsing, rendering and live-testing prompts.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use promptcatalog::{
    Catalog, Category, LoadError, LoadPolicy, MissingParameterError, NotFoundError, ParameterValues, PromptDefinition,
    ValidationError,
};
use promptlab::cli::{Cli, Command, OutputFormat, get_log_path};
use promptlab::config::Config;
use promptlab::llm::{LlmError, create_client};
use promptlab::tester::{BatchReport, TestResult, Tester, TesterError, TesterOptions};

const EXIT_OTHER: u8 = 1;
const EXIT_VALIDATION: u8 = 2;
const EXIT_NOT_FOUND: u8 = 3;
const EXIT_MISSING_PARAMETER: u8 = 4;
const EXIT_EXTERNAL_CALL: u8 = 5;

fn parse_level(s: &str) -> Option<tracing::Level> {
    match s.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" | "WARNING" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) {
    // Note: Can't log params here since logging isn't initialized yet
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }),
        None => tracing::Level::INFO,
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let log_path = get_log_path();
    let log_file = log_path
        .parent()
        .map(fs::create_dir_all)
        .transpose()
        .and_then(|_| fs::OpenOptions::new().create(true).append(true).open(&log_path));

    match log_file {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}; logging to stderr", log_path.display(), e);
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }

    info!("Logging initialized (level: {:?})", level);
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref());

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            debug!(error = ?e, "main: command failed");
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Map an error to the documented exit code by looking through its cause chain
fn exit_code(err: &eyre::Report) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<LoadError>() {
            return match e {
                LoadError::Invalid(_) => EXIT_VALIDATION,
                _ => EXIT_OTHER,
            };
        }
        if cause.downcast_ref::<ValidationError>().is_some() {
            return EXIT_VALIDATION;
        }
        if cause.downcast_ref::<NotFoundError>().is_some() {
            return EXIT_NOT_FOUND;
        }
        if cause.downcast_ref::<MissingParameterError>().is_some() {
            return EXIT_MISSING_PARAMETER;
        }
        if let Some(e) = cause.downcast_ref::<TesterError>() {
            return match e {
                TesterError::MissingParameter(_) => EXIT_MISSING_PARAMETER,
                TesterError::ExternalCall(_) => EXIT_EXTERNAL_CALL,
            };
        }
        if let Some(e) = cause.downcast_ref::<LlmError>() {
            debug!(transport = e.is_transport(), status = ?e.status(), "exit_code: LLM error");
            return match e {
                LlmError::MissingApiKey(_) | LlmError::UnknownProvider(_) => EXIT_OTHER,
                _ => EXIT_EXTERNAL_CALL,
            };
        }
    }
    EXIT_OTHER
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let prompts_dir = cli.dir.clone().unwrap_or_else(|| config.catalog.prompts_dir.clone());
    info!(prompts_dir = %prompts_dir.display(), "PromptLab loaded config");

    // Dispatch command
    debug!(command = ?cli.command, "run: dispatching command");
    match cli.command {
        Command::List { category, format } => {
            let catalog = load_catalog(&prompts_dir, &config)?;
            cmd_list(&catalog, category, format)?;
        }
        Command::Categories => {
            let catalog = load_catalog(&prompts_dir, &config)?;
            cmd_categories(&catalog);
        }
        Command::Search { query, format } => {
            let catalog = load_catalog(&prompts_dir, &config)?;
            cmd_search(&catalog, &query, format)?;
        }
        Command::Show { name, format } => {
            let catalog = load_catalog(&prompts_dir, &config)?;
            cmd_show(catalog.get(&name)?, format)?;
        }
        Command::Render { name, input } => {
            let catalog = load_catalog(&prompts_dir, &config)?;
            cmd_render(catalog.get(&name)?, input)?;
        }
        Command::Validate => return cmd_validate(&prompts_dir),
        Command::Stats { format } => {
            let catalog = load_catalog(&prompts_dir, &config)?;
            cmd_stats(&catalog, format)?;
        }
        Command::Test {
            target,
            input,
            model,
            format,
        } => return cmd_test(&config, &prompts_dir, &target, input, model.as_deref(), format).await,
        Command::TestAll {
            model,
            category,
            format,
        } => return cmd_test_all(&config, &prompts_dir, model.as_deref(), category, format).await,
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the library with the configured policy, warning about skipped documents
fn load_catalog(dir: &Path, config: &Config) -> Result<Catalog> {
    debug!(?dir, policy = ?config.catalog.on_invalid, "load_catalog: called");
    let catalog = Catalog::load_with(dir, config.catalog.on_invalid)
        .with_context(|| format!("Failed to load prompt library from {}", dir.display()))?;

    if !catalog.skipped().is_empty() {
        warn!(skipped = catalog.skipped().len(), "load_catalog: invalid documents skipped");
        eprintln!(
            "{} skipped {} invalid document(s); run `pl validate` for details",
            "warning:".yellow().bold(),
            catalog.skipped().len()
        );
    }
    Ok(catalog)
}

fn print_table(prompts: &[&PromptDefinition]) {
    if prompts.is_empty() {
        println!("No prompts found.");
        return;
    }
    for p in prompts {
        println!("{:<28} {:<18} {}", p.name.bold(), p.category.to_string().cyan(), p.description);
    }
}

fn cmd_list(catalog: &Catalog, category: Option<Category>, format: OutputFormat) -> Result<()> {
    debug!(?category, %format, "cmd_list: called");
    let prompts = match category {
        Some(c) => catalog.get_by_category(c),
        None => catalog.list(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prompts)?),
        OutputFormat::Text => print_table(&prompts),
    }
    Ok(())
}

fn cmd_categories(catalog: &Catalog) {
    debug!("cmd_categories: called");
    for category in catalog.categories() {
        println!("{:<18} {}", category.to_string().cyan(), catalog.get_by_category(category).len());
    }
}

fn cmd_search(catalog: &Catalog, query: &str, format: OutputFormat) -> Result<()> {
    debug!(%query, %format, "cmd_search: called");
    let hits = catalog.search(query);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
        OutputFormat::Text => print_table(&hits),
    }
    Ok(())
}

fn cmd_show(prompt: &PromptDefinition, format: OutputFormat) -> Result<()> {
    debug!(name = %prompt.name, %format, "cmd_show: called");
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(prompt)?);
        return Ok(());
    }

    println!("{} (v{})", prompt.name.bold(), prompt.version);
    println!("Category:    {}", prompt.category.to_string().cyan());
    if !prompt.description.is_empty() {
        println!("Description: {}", prompt.description);
    }
    if let Some(source) = &prompt.source {
        println!("Source:      {}", source.display());
    }

    let meta = &prompt.metadata;
    println!("Model:       {}", meta.recommended_model);
    println!("Temperature: {}", meta.temperature);
    println!("Tokens:      ~{} expected", meta.expected_tokens);
    if let Some(max) = meta.max_tokens {
        println!("Max tokens:  {}", max);
    }
    if !meta.tags.is_empty() {
        println!("Tags:        {}", meta.tags.iter().cloned().collect::<Vec<_>>().join(", "));
    }

    println!();
    println!("{}", "Parameters".bold());
    for p in &prompt.parameters {
        let requirement = match (&p.default, p.required) {
            (_, true) => "required".to_string(),
            (Some(default), false) => format!("optional, default {:?}", default),
            (None, false) => "optional".to_string(),
        };
        println!("  {} ({}, {}) {}", p.name.bold(), p.kind, requirement, p.description);
    }

    println!();
    println!("{}", "Template".bold());
    println!("{}", prompt.template.trim_end());

    if !prompt.examples.is_empty() {
        println!();
        println!("{} {}", "Examples:".bold(), prompt.examples.len());
    }
    Ok(())
}

fn to_values(input: Vec<(String, String)>) -> ParameterValues {
    input.into_iter().collect()
}

fn cmd_render(prompt: &PromptDefinition, input: Vec<(String, String)>) -> Result<()> {
    debug!(name = %prompt.name, inputs = input.len(), "cmd_render: called");
    let rendered = prompt.render(&to_values(input))?;
    println!("{}", rendered);
    Ok(())
}

fn cmd_validate(dir: &Path) -> Result<ExitCode> {
    debug!(?dir, "cmd_validate: called");
    let catalog = Catalog::load_with(dir, LoadPolicy::SkipInvalid)
        .with_context(|| format!("Failed to load prompt library from {}", dir.display()))?;

    if catalog.skipped().is_empty() {
        println!("{} {} prompt(s) valid", "✓".green(), catalog.len());
        return Ok(ExitCode::SUCCESS);
    }

    for issue in catalog.skipped() {
        println!("{} {}", "✗".red(), issue);
    }
    println!();
    println!("{} valid, {} invalid", catalog.len(), catalog.skipped().len());
    Ok(ExitCode::from(EXIT_VALIDATION))
}

fn cmd_stats(catalog: &Catalog, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_stats: called");
    let stats = catalog.stats();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("Prompt Library Statistics");
            println!("-------------------------");
            println!("Total prompts: {}", stats.total_prompts);
            println!("Categories:    {}", stats.categories);
            for (category, count) in &stats.category_counts {
                println!("  {:<18} {}", category, count);
            }
            println!("Models used:   {}", stats.models_used.join(", "));
        }
    }
    Ok(())
}

/// Resolve a `test` target: an existing YAML file, else a catalog name
fn resolve_target(target: &str, dir: &Path, config: &Config) -> Result<PromptDefinition> {
    let path = PathBuf::from(target);
    let looks_like_file = path.is_file() || matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));

    if looks_like_file {
        debug!(?path, "resolve_target: treating target as a file");
        return Ok(PromptDefinition::from_file(&path)?);
    }

    debug!(%target, "resolve_target: treating target as a prompt name");
    let catalog = load_catalog(dir, config)?;
    Ok(catalog.get(target)?.clone())
}

fn build_tester(config: &Config) -> Result<Tester> {
    config.validate()?;
    let client = create_client(&config.llm)?;
    Ok(Tester::new(client)
        .with_pricing(config.price_table())
        .with_options(TesterOptions {
            default_max_tokens: config.llm.max_output_tokens,
        }))
}

fn print_result(result: &TestResult) {
    let status = if result.passed { "PASS".green().bold() } else { "FAIL".red().bold() };
    println!("{} {} ({})", status, result.prompt_name.bold(), result.model);
    println!(
        "Quality: {:.1}/10  Latency: {}ms  Tokens: {} in / {} out  Est. cost: ${:.6}",
        result.quality_score,
        result.latency_ms,
        result.usage.input_tokens,
        result.usage.output_tokens,
        result.estimated_cost
    );
    if !result.missing_keywords.is_empty() {
        println!("Missing keywords: {}", result.missing_keywords.join(", "));
    }
    println!();
    println!("{}", result.output.trim_end());
}

async fn cmd_test(
    config: &Config,
    dir: &Path,
    target: &str,
    input: Vec<(String, String)>,
    model: Option<&str>,
    format: OutputFormat,
) -> Result<ExitCode> {
    debug!(%target, ?model, %format, "cmd_test: called");
    let definition = resolve_target(target, dir, config)?;

    let mut values = definition
        .examples
        .first()
        .map(|e| e.input.clone())
        .unwrap_or_default();
    values.extend(to_values(input));

    let tester = build_tester(config)?;
    let result = tester.test_prompt(&definition, &values, model).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_result(&result),
    }

    Ok(if result.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_OTHER)
    })
}

async fn cmd_test_all(
    config: &Config,
    dir: &Path,
    model: Option<&str>,
    category: Option<Category>,
    format: OutputFormat,
) -> Result<ExitCode> {
    debug!(?model, ?category, %format, "cmd_test_all: called");
    let catalog = load_catalog(dir, config)?;
    let definitions = match category {
        Some(c) => catalog.get_by_category(c),
        None => catalog.list(),
    };

    let tester = build_tester(config)?;
    let report: BatchReport = tester.test_batch(definitions, model).await;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "total": report.total(),
                "passed": report.passed(),
                "failed": report.failed(),
                "pass_rate": report.pass_rate(),
                "avg_quality": report.avg_quality(),
                "avg_latency_ms": report.avg_latency_ms(),
                "results": report.results,
                "failures": report.failures,
            }))?
        ),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    Ok(if report.failed() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_OTHER)
    })
}
