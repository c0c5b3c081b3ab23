use std::sync::Mutex;

// Serializes tests that change process-wide state (environment variables and
// the current working directory)
pub static TEST_MUTEX: Mutex<()> = Mutex::new(());
