use anyhow::Result;
use qa_report::cli;

// Main entry point
fn main() -> Result<()> {
    cli::handle_calls()
}
