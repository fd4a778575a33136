use log::LevelFilter;

const WORKSPACE_CRATES: &[&str] =
&[
    "marrow",
    "anim_marrow",
    "math_marrow",
    "nab_marrow",
];

#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVELS: (LevelFilter, LevelFilter) = (LevelFilter::Warn, LevelFilter::Debug);
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVELS: (LevelFilter, LevelFilter) = (LevelFilter::Warn, LevelFilter::Info);

/// Install the colored logger. Third-party crates log at warn, workspace crates at debug (info in release).
/// `RUST_LOG` overrides both. Safe to call more than once; only the first call installs a logger.
pub fn init_logging(app_name: &str)
{
    let mut builder = colog::basic_builder();
    builder.filter_level(DEFAULT_LOG_LEVELS.0);
    for crate_name in WORKSPACE_CRATES
    {
        builder.filter_module(crate_name, DEFAULT_LOG_LEVELS.1);
    }

    if builder.parse_default_env().try_init().is_ok()
    {
        log::info!("=== Starting {} (PID {}) ===", app_name, std::process::id());
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn init_twice()
    {
        init_logging("nab_marrow tests");
        init_logging("nab_marrow tests");
        log::debug!("still alive");
    }
}
