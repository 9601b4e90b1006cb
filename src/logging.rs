use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Route logs to `<log_dir>/<name>.log` (append). Falls back to stderr.
///
/// Stdout is left untouched: it carries the JSON result.
pub fn init(name: &str, log_dir: &Path) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            record.level(),
            record.args()
        )
    });

    let file = fs::create_dir_all(log_dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(format!("{}.log", name)))
    });

    match file {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Error setting up logging in {}: {}", log_dir.display(), e);
            builder.target(Target::Stderr);
        }
    }

    if builder.try_init().is_ok() {
        log::info!("Script started successfully");
        log::info!("Logging setup completed");
    }
}
