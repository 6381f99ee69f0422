/// Installs `env_logger` for a test. Output is captured by the test harness
/// and only shown for failing tests, set `RUST_LOG` to choose the level.
pub fn test_logger() {
    if cfg!(not(feature = "merc_miri")) {
        // Tests run in parallel, so only the first call installs the logger.
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
