use super::*;

#[test]
fn init_is_repeatable() {
    init();
    init();
    tracing::info!(component = "logging", "subscriber accepts events");
}
