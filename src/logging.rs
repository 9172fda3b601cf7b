use env_logger::Env;
use log::LevelFilter;

/// Install the process logger. `RUST_LOG` overrides `default_level`.
/// Safe to call more than once; later calls are ignored.
pub fn init(default_level: LevelFilter) {
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

/// Logger for unit and integration tests; output is captured per test.
pub fn init_for_tests() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Debug)
        .try_init();
}
