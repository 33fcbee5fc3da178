/// Route `log` output through the test harness; `RUST_LOG=debug` shows parser traces
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
