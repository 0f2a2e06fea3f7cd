// CLI commands for running comparisons against an execution service
use anyhow::{bail, Context, Result};
use arena_core::{
    supported_languages, ArenaConfig, ExecutionBackend, ExecutionResult, Language, Orchestrator,
    RemoteExecutionClient, RunReport, SlotId, SlotInput, SlotState,
};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Options for `arena-cli run`
pub struct RunOptions<'a> {
    pub first: &'a Path,
    pub first_lang: Option<&'a str>,
    pub second: &'a Path,
    pub second_lang: Option<&'a str>,
    pub url: Option<&'a str>,
    pub timeout_secs: Option<u64>,
    pub json: bool,
    pub fail_on_error: bool,
}

/// Read a snippet and work out its language: the explicit flag wins, then the
/// file extension. An unknown extension is passed through as-is so the slot
/// reports it as unsupported instead of aborting the whole run.
fn load_slot(path: &Path, lang: Option<&str>) -> Result<SlotInput> {
    let code = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let language = match lang {
        Some(lang) => lang.to_string(),
        None => Language::from_extension(extension)
            .map(|lang| lang.value().to_string())
            .unwrap_or_else(|| extension.to_string()),
    };

    Ok(SlotInput::new(code, language))
}

/// Run both snippets side by side and print each result as it lands
pub async fn run_comparison(opts: RunOptions<'_>) -> Result<()> {
    let first = load_slot(opts.first, opts.first_lang)?;
    let second = load_slot(opts.second, opts.second_lang)?;

    let mut config = ArenaConfig::from_env();
    if let Some(url) = opts.url {
        config = config.with_service_url(url);
    }
    if let Some(secs) = opts.timeout_secs {
        config = config.with_request_timeout(Some(Duration::from_secs(secs)));
    }

    debug!(?config, "Resolved configuration");

    let client = RemoteExecutionClient::new(&config)
        .context("Failed to build execution service client")?;

    if !opts.json {
        println!(
            "🚀 Comparing {} vs {} via {}",
            first.language,
            second.language,
            client.execute_url()
        );
    }

    let orchestrator = Orchestrator::new(client);
    let pending = orchestrator.begin(first, second)?;

    let (report, _, _) = tokio::join!(
        pending.execute(),
        announce(&orchestrator, SlotId::First, opts.json),
        announce(&orchestrator, SlotId::Second, opts.json),
    );
    let report = report?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if opts.fail_on_error {
        let failed: Vec<String> = report
            .results
            .iter()
            .filter(|(_, result)| !result.success)
            .map(|(slot, _)| slot.to_string())
            .collect();
        if !failed.is_empty() {
            bail!("Slot(s) {} failed", failed.join(", "));
        }
    }

    Ok(())
}

/// Print one slot as soon as it settles, without waiting for its sibling
async fn announce<B: ExecutionBackend>(orchestrator: &Orchestrator<B>, slot: SlotId, quiet: bool) {
    let mut rx = orchestrator.results().subscribe(slot);
    let state = match rx.wait_for(SlotState::is_terminal).await {
        Ok(state) => state.clone(),
        Err(_) => return,
    };

    if quiet {
        return;
    }
    if let Some(result) = state.result() {
        let mark = if result.success { "✓" } else { "✗" };
        println!("{} Slot {} [{}] finished", mark, slot, result.language);
        print_output(result);
    }
}

fn print_output(result: &ExecutionResult) {
    for line in result.output.lines() {
        println!("   │ {}", line);
    }
    if let Some(error) = &result.error {
        println!("   │ error: {}", error);
    }
}

fn format_seconds(value: Option<f64>) -> String {
    value
        .map(|secs| format!("{:.3}s", secs))
        .unwrap_or_else(|| "-".to_string())
}

fn format_bytes(value: Option<u64>) -> String {
    match value {
        Some(bytes) if bytes >= 1024 * 1024 => format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0)),
        Some(bytes) if bytes >= 1024 => format!("{:.1} KiB", bytes as f64 / 1024.0),
        Some(bytes) => format!("{} B", bytes),
        None => "-".to_string(),
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("📊 Run {}", report.run_id);
    println!(
        "   {:<6} {:<12} {:<8} {:>10} {:>12} {:>10} {:>12}",
        "slot", "language", "status", "compile", "compile mem", "execute", "execute mem"
    );
    for (slot, result) in report.results.iter() {
        println!(
            "   {:<6} {:<12} {:<8} {:>10} {:>12} {:>10} {:>12}",
            slot.to_string(),
            result.language,
            if result.success { "ok" } else { "failed" },
            format_seconds(result.compilation_time),
            format_bytes(result.compilation_memory_bytes),
            format_seconds(result.execution_time),
            format_bytes(result.execution_memory_bytes),
        );
    }
}

/// List the languages a slot may use
pub fn list_languages() {
    println!("Supported languages:");
    for lang in supported_languages() {
        println!("  {:<12} {:<12} {}", lang.value, lang.label, lang.extension);
    }
}
