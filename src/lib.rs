pub mod db;
pub mod format;
pub mod location;
pub mod models;
pub mod replay;
pub mod sensing;
pub mod session;
pub mod settings;

/// Installs the `env_logger` backend at `info`; `RUST_LOG` overrides.
pub fn init_logging() {
    if let Err(err) = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
    {
        eprintln!("logger already initialised: {err}");
    }
}
