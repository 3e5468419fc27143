//! Shared test setup. `RUST_LOG=debug cargo test -- --nocapture` surfaces
//! the kernel's eviction/split/merge trace without any test-specific wiring.

pub fn init_logging() {
    let _ = env_logger::try_init();
}
