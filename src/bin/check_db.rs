//! Startup database check
//!
//! Takes no flags: everything comes from the environment (and `.env`). Exits
//! 0 when the database is ready or the check is bypassed, 1 otherwise.
//!
//! Logging goes to stderr when `RUST_LOG` is set, using the usual filter
//! syntax (`debug`, `sitegauge::query=debug`, ...).

use sitegauge::check::{run_checks, StdoutReporter};
use sitegauge::AppConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    let config = match AppConfig::new(&None) {
        Ok(c) => c,
        Err(e) => {
            println!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run_checks(&config, &mut StdoutReporter);
    std::process::exit(outcome.exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_directives_are_accepted() {
        let filter = EnvFilter::try_new("warn,sitegauge::query=debug").unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("sitegauge::query=debug"));
        assert!(EnvFilter::try_new("sitegauge=debug").is_ok());
    }
}
