//! Output formatting for scenario results - console lines or JSON lines

use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use crate::config::BenchConfig;
use crate::metrics::ScenarioResult;
use crate::scenarios::Scenario;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(OutputFormat::Console),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultMetadata {
    pub timestamp: String,
    pub version: String,
}

/// JSON-serializable scenario result
#[derive(Debug, Serialize)]
pub struct JsonScenarioResult<'a> {
    pub metadata: ResultMetadata,
    pub label: &'a str,
    pub scenario: Scenario,
    pub operation: &'a str,
    pub ops: u64,
    pub workers: usize,
    pub elapsed_secs: f64,
    pub ops_per_sec: Option<u64>,
    pub mean_latency_ns: Option<u64>,
}

impl<'a> JsonScenarioResult<'a> {
    pub fn from_result(result: &'a ScenarioResult) -> Self {
        JsonScenarioResult {
            metadata: ResultMetadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            label: &result.label,
            scenario: result.scenario,
            operation: result.operation,
            ops: result.ops,
            workers: result.workers,
            elapsed_secs: result.elapsed.as_secs_f64(),
            ops_per_sec: result.throughput(),
            mean_latency_ns: result.mean_latency_ns(),
        }
    }
}

/// Render one result in the given format, without a trailing newline.
pub fn format_result(result: &ScenarioResult, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Console => Ok(result.to_string()),
        OutputFormat::Json => serde_json::to_string(&JsonScenarioResult::from_result(result)),
    }
}

/// Run header, printed once before the first scenario.
pub fn format_header(config: &BenchConfig) -> String {
    format!(
        "duration={:?}, c={} size={}",
        config.duration, config.concurrency, config.value_size
    )
}

/// Writes results as they arrive.
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn header(&mut self, config: &BenchConfig) -> std::io::Result<()> {
        if self.format == OutputFormat::Console {
            writeln!(self.out, "{}", format_header(config))?;
        }
        Ok(())
    }

    pub fn report(&mut self, result: &ScenarioResult) -> std::io::Result<()> {
        let line = format_result(result, self.format)?;
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
