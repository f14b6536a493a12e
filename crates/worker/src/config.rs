use std::path::PathBuf;

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls when the queue is empty (default: `2` seconds).
    pub poll_interval_secs: u64,
    /// Claims older than this become deliverable again (default: `600`).
    /// A crash mid-job therefore redelivers after at most this long.
    pub visibility_timeout_secs: i64,
    /// Directory artifacts are written to (default: `generated`).
    pub artifact_root: PathBuf,
    /// Externally visible base URL used to build artifact links
    /// (default: `http://127.0.0.1:8000`).
    pub base_url: String,
    /// Name recorded on claimed queue entries
    /// (default: `worker-{pid}`).
    pub worker_name: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `POLL_INTERVAL_SECS`      | `2`                     |
    /// | `VISIBILITY_TIMEOUT_SECS` | `600`                   |
    /// | `GENERATED_DIR`           | `generated`             |
    /// | `BASE_URL`                | `http://127.0.0.1:8000` |
    /// | `WORKER_NAME`             | `worker-{pid}`          |
    pub fn from_env() -> Self {
        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let visibility_timeout_secs: i64 = std::env::var("VISIBILITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("VISIBILITY_TIMEOUT_SECS must be a valid i64");

        let artifact_root =
            PathBuf::from(std::env::var("GENERATED_DIR").unwrap_or_else(|_| "generated".into()));

        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".into());

        let worker_name = std::env::var("WORKER_NAME")
            .unwrap_or_else(|_| default_worker_name(std::process::id()));

        Self {
            poll_interval_secs,
            visibility_timeout_secs,
            artifact_root,
            base_url,
            worker_name,
        }
    }
}

/// Default worker name when `WORKER_NAME` is unset.
fn default_worker_name(pid: u32) -> String {
    format!("worker-{pid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_worker_name_includes_pid() {
        assert_eq!(default_worker_name(4242), "worker-4242");
    }
}
