//! Structured JSON-lines logging.
//!
//! Every record carries a run id, a monotonic sequence number, level,
//! component and event. Lines go to stderr, and additionally to
//! `$LOG_DIR/<run_id>/events.jsonl` (trace/debug to `trace.jsonl`) when
//! `LOG_DIR` is set.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::error::EngineError;
use crate::model::SummaryRecord;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Level::Info)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Ingest,    // Upload parsing, schema checks
    Summary,   // Summary computation
    Analytics, // Per-dataset analytics
    Retention, // History cap, eviction
    Dashboard, // Cross-dataset aggregation
    Report,    // Report composition
    Store,     // Persistence
    System,    // Startup, config
    Profile,   // Timing
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Ingest => "ingest",
            Domain::Summary => "summary",
            Domain::Analytics => "analytics",
            Domain::Retention => "retention",
            Domain::Dashboard => "dashboard",
            Domain::Report => "report",
            Domain::Store => "store",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

struct RunContext {
    run_id: String,
    sinks: Option<FileSinks>,
}

struct FileSinks {
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

fn open_sinks(base: &str, run_id: &str) -> Option<FileSinks> {
    let mut run_dir = PathBuf::from(base);
    run_dir.push(run_id);
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
        return None;
    }
    let _ = std::fs::write(
        run_dir.join("manifest.json"),
        json!({
            "run_id": run_id,
            "ts": ts_now(),
            "pid": process::id(),
        })
        .to_string(),
    );
    let open = |name: &str| match File::create(run_dir.join(name)) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", name, err);
            None
        }
    };
    Some(FileSinks {
        events: open("events.jsonl")?,
        trace: open("trace.jsonl")?,
    })
}

fn run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let sinks = std::env::var("LOG_DIR").ok().and_then(|base| open_sinks(&base, &run_id));
        RunContext { run_id, sinks }
    })
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "password", "token", "credentials"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["user", "dataset_id", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = format_record(level, domain.as_str(), event, fields);
    let ctx = run_context();
    if let Some(sinks) = &ctx.sinks {
        match level {
            Level::Trace | Level::Debug => write_line(&sinks.trace, &line),
            _ => write_line(&sinks.events, &line),
        }
    }
    eprintln!("{}", line);
}

fn format_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) -> String {
    let ctx = run_context();
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_upload(user: &str, dataset_id: i64, name: &str, rows: u64, fingerprint: &str) {
    log(
        Level::Info,
        Domain::Ingest,
        "upload_accepted",
        obj(&[
            ("user", v_str(user)),
            ("dataset_id", json!(dataset_id)),
            ("name", v_str(name)),
            ("rows", json!(rows)),
            ("fingerprint", v_str(fingerprint)),
        ]),
    );
}

fn summary_fields(user: &str, name: &str, summary: &SummaryRecord) -> Map<String, Value> {
    obj(&[
        ("user", v_str(user)),
        ("name", v_str(name)),
        ("rows", json!(summary.total_count)),
        ("types", json!(summary.type_distribution.len())),
        ("avg_flowrate", json!(summary.avg_flowrate)),
        ("avg_pressure", json!(summary.avg_pressure)),
        ("avg_temperature", json!(summary.avg_temperature)),
    ])
}

pub fn log_summary(user: &str, name: &str, summary: &SummaryRecord) {
    log(Level::Debug, Domain::Summary, "summarized", summary_fields(user, name, summary));
}

/// Rejections carry the structured error detail, never a formatted message.
pub fn log_rejected(user: &str, name: &str, err: &EngineError) {
    let mut fields = obj(&[
        ("user", v_str(user)),
        ("name", v_str(name)),
        ("kind", v_str(err.kind().as_str())),
    ]);
    match err {
        EngineError::Schema { missing } => {
            fields.insert("missing".to_string(), json!(missing));
        }
        EngineError::Parse { row, column, value } => {
            fields.insert("row".to_string(), json!(row));
            fields.insert("column".to_string(), v_str(column));
            fields.insert("value".to_string(), v_str(value));
        }
        _ => {}
    }
    log(Level::Warn, Domain::Ingest, "upload_rejected", fields);
}

pub fn log_read(domain: Domain, event: &str, user: &str, dataset_id: Option<i64>) {
    log(
        Level::Debug,
        domain,
        event,
        obj(&[
            ("user", v_str(user)),
            ("dataset_id", dataset_id.map(|id| json!(id)).unwrap_or(Value::Null)),
        ]),
    );
}

pub fn log_failure(domain: Domain, event: &str, user: &str, err: &EngineError) {
    let level = if err.kind().is_user_correctable() || matches!(err, EngineError::NotFound { .. }) {
        Level::Warn
    } else {
        Level::Error
    };
    log(
        level,
        domain,
        event,
        obj(&[
            ("user", v_str(user)),
            ("kind", v_str(err.kind().as_str())),
            ("detail", v_str(&err.to_string())),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits elapsed time at trace level on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================
