use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const DB_ENV_VAR: &str = "PAYROLL_DB";

/// Runtime settings resolved from the command line, `PAYROLL_DB` and the
/// platform data directory, in that order.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub verbosity: u8,
}

impl Config {
    /// `db_override` carries `--db`, or `PAYROLL_DB` when clap read it from the environment.
    pub fn resolve(db_override: Option<PathBuf>, verbosity: u8) -> Self {
        Self {
            db_path: db_override.unwrap_or_else(default_db_path),
            verbosity,
        }
    }

    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_for(self.verbosity)))
    }
}

fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn default_db_path() -> PathBuf {
    // platform data dir, else the working directory
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "payroll") {
        proj_dirs.data_dir().join("payroll.db")
    } else {
        PathBuf::from("payroll.db")
    }
}

/// Install the stderr subscriber. Stdout is reserved for command output.
pub fn init_logging(config: &Config) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(config.log_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/elsewhere.db")), 0);
        assert_eq!(config.db_path, PathBuf::from("/tmp/elsewhere.db"));
    }

    #[test]
    fn default_path_names_the_store() {
        let config = Config::resolve(None, 0);
        assert_eq!(config.db_path, default_db_path());
        assert_eq!(
            config.db_path.file_name().and_then(|n| n.to_str()),
            Some("payroll.db")
        );
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(5), "debug");
    }
}
