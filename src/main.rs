use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

use equipviz::config::Config;
use equipviz::logging::{log, obj, v_str, Domain, Level};
use equipviz::model::DatasetId;
use equipviz::storage::SqliteStore;
use equipviz::AnalyticsEngine;

const USAGE: &str = "usage: equipviz <command> <user> [args]

commands:
  upload <user> <file.csv>   validate, summarize and store a dataset
  history <user>             last five uploads, newest first
  show <user> <id>           stored table and summary
  analytics <user> <id>      per-parameter statistics and trends
  dashboard <user>           overview across retained uploads
  report <user> <id>         printable report (written to REPORT_DIR)
  delete <user> <id>         remove a dataset";

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_id(arg: Option<&String>) -> Result<DatasetId> {
    let raw = arg.ok_or_else(|| anyhow!("missing dataset id\n\n{}", USAGE))?;
    Ok(DatasetId(raw.parse().with_context(|| format!("bad dataset id {:?}", raw))?))
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let (cmd, user) = match (args.first(), args.get(1)) {
        (Some(cmd), Some(user)) => (cmd.as_str(), user.as_str()),
        _ => bail!("{}", USAGE),
    };

    let cfg = Config::from_env();
    let store = SqliteStore::new(&cfg.sqlite_path)?;
    store.init()?;
    let engine = AnalyticsEngine::new(Arc::new(store));
    log(
        Level::Debug,
        Domain::System,
        "start",
        obj(&[("command", v_str(cmd)), ("sqlite_path", v_str(&cfg.sqlite_path))]),
    );

    match cmd {
        "upload" => {
            let path = args.get(2).ok_or_else(|| anyhow!("missing csv path\n\n{}", USAGE))?;
            let bytes = fs::read(path).with_context(|| format!("cannot read {}", path))?;
            let name = Path::new(path)
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("dataset.csv");
            let recorded = engine.upload(user, name, &bytes)?;
            print_json(&serde_json::json!({
                "id": recorded.dataset.id,
                "summary": recorded.dataset.summary,
                "evicted": recorded.evicted,
            }))
        }
        "history" => print_json(&engine.history(user)?),
        "show" => print_json(&engine.dataset(user, parse_id(args.get(2))?)?),
        "analytics" => print_json(&engine.analytics(user, parse_id(args.get(2))?)?),
        "dashboard" => print_json(&engine.dashboard(user)?),
        "report" => {
            let doc = engine.report(user, parse_id(args.get(2))?)?;
            let text = doc.render_text();
            fs::create_dir_all(&cfg.report_dir)?;
            let out: PathBuf = Path::new(&cfg.report_dir).join(format!("{}.txt", doc.attachment_name()));
            fs::write(&out, &text).with_context(|| format!("cannot write {}", out.display()))?;
            print!("{}", text);
            eprintln!("wrote report {}", out.display());
            Ok(())
        }
        "delete" => {
            let id = parse_id(args.get(2))?;
            engine.delete(user, id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        other => bail!("unknown command {:?}\n\n{}", other, USAGE),
    }
}
