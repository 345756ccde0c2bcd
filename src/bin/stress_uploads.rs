//! Parallel upload stress: many threads upload random tables for a handful
//! of users at once, then the retention cap is checked for every user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use equipviz::config::Config;
use equipviz::retention::RETAINED_PER_USER;
use equipviz::storage::{DatasetStore, MemoryStore, SqliteStore};
use equipviz::AnalyticsEngine;

const TYPES: [&str; 5] = ["Pump", "Valve", "Compressor", "HeatExchanger", "Reactor"];

fn generate_csv(rng: &mut StdRng, rows: usize) -> String {
    let mut out = String::from("Equipment Name,Type,Flowrate,Pressure,Temperature\n");
    for i in 0..rows {
        let kind = TYPES[rng.gen_range(0..TYPES.len())];
        out.push_str(&format!(
            "{}-{},{},{:.3},{:.3},{:.3}\n",
            kind,
            i,
            kind,
            rng.gen_range(50.0..250.0),
            rng.gen_range(1.0..15.0),
            rng.gen_range(80.0..160.0),
        ));
    }
    out
}

fn run<S: DatasetStore + 'static>(engine: Arc<AnalyticsEngine<S>>, cfg: &Config) -> Result<()> {
    let uploads = Arc::new(AtomicU64::new(0));
    let evictions = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    let mut handles = Vec::new();
    for t in 0..cfg.stress_threads.max(1) {
        let engine = Arc::clone(&engine);
        let uploads = Arc::clone(&uploads);
        let evictions = Arc::clone(&evictions);
        let per_thread = cfg.stress_uploads;
        let users = cfg.stress_users.max(1);
        let rows = cfg.stress_rows;
        let seed = cfg.stress_seed + t as u64;
        handles.push(thread::spawn(move || -> Result<()> {
            let mut rng = StdRng::seed_from_u64(seed);
            for i in 0..per_thread {
                let user = format!("user-{}", rng.gen_range(0..users));
                let csv = generate_csv(&mut rng, rows);
                let rec = engine.upload(&user, &format!("t{}-{}.csv", t, i), csv.as_bytes())?;
                uploads.fetch_add(1, Ordering::Relaxed);
                evictions.fetch_add(rec.evicted.len() as u64, Ordering::Relaxed);
            }
            Ok(())
        }));
    }
    for h in handles {
        match h.join() {
            Ok(res) => res?,
            Err(_) => bail!("upload thread panicked"),
        }
    }

    let elapsed = started.elapsed();
    let mut violations = 0;
    for u in 0..cfg.stress_users.max(1) {
        let user = format!("user-{}", u);
        let kept = engine.history(&user)?.len();
        if kept > RETAINED_PER_USER {
            violations += 1;
            eprintln!("{} retains {} datasets", user, kept);
        }
        if let Some(rec) = engine.dashboard(&user)?.record() {
            println!(
                "{}: datasets={} rows={} most_common={:?} efficiency={:?} outliers={}",
                user,
                rec.dataset_count,
                rec.total_count,
                rec.insights.most_common_type,
                rec.insights.efficiency_score,
                rec.insights.outlier_count
            );
        }
    }

    let total = uploads.load(Ordering::Relaxed);
    println!(
        "uploads={} evictions={} threads={} elapsed_ms={} uploads_per_sec={:.1}",
        total,
        evictions.load(Ordering::Relaxed),
        cfg.stress_threads,
        elapsed.as_millis(),
        total as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    if violations > 0 {
        bail!("{} users exceed the retention cap", violations);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cfg = Config::from_env();
    match std::env::args().nth(1).as_deref() {
        Some("sqlite") => {
            let store = SqliteStore::new(&cfg.sqlite_path)?;
            store.init()?;
            run(Arc::new(AnalyticsEngine::new(Arc::new(store))), &cfg)
        }
        _ => run(Arc::new(AnalyticsEngine::new(Arc::new(MemoryStore::new()))), &cfg),
    }
}
