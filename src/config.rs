#[derive(Debug, Clone)]
pub struct Config {
    pub sqlite_path: String,
    pub report_dir: String,
    pub stress_users: usize,
    pub stress_uploads: usize,
    pub stress_rows: usize,
    pub stress_threads: usize,
    pub stress_seed: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            sqlite_path: std::env::var("SQLITE_PATH").unwrap_or_else(|_| "./equipviz.sqlite".to_string()),
            report_dir: std::env::var("REPORT_DIR").unwrap_or_else(|_| "./reports".to_string()),
            stress_users: std::env::var("STRESS_USERS").ok().and_then(|v| v.parse().ok()).unwrap_or(4),
            stress_uploads: std::env::var("STRESS_UPLOADS").ok().and_then(|v| v.parse().ok()).unwrap_or(50),
            stress_rows: std::env::var("STRESS_ROWS").ok().and_then(|v| v.parse().ok()).unwrap_or(200),
            stress_threads: std::env::var("STRESS_THREADS").ok().and_then(|v| v.parse().ok()).unwrap_or_else(num_cpus::get),
            stress_seed: std::env::var("STRESS_SEED").ok().and_then(|v| v.parse().ok()).unwrap_or(42),
        }
    }
}
