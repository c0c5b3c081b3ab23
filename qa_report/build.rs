use clap::CommandFactory;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let version: &'static str = Box::leak(env::var("CARGO_PKG_VERSION")?.into_boxed_str());

    let man_dir = out_dir.join("man").join("man1");
    fs::create_dir_all(&man_dir)?;

    // Generate manpages for the main command and all subcommands
    let cmd = qa_report_cli_types::Cli::command().version(version);
    let mut buffer: Vec<u8> = Default::default();
    clap_mangen::Man::new(cmd.clone()).render(&mut buffer)?;
    fs::write(man_dir.join("qa-report.1"), &buffer)?;

    for subcmd in cmd.get_subcommands() {
        let mut buffer: Vec<u8> = Default::default();
        clap_mangen::Man::new(subcmd.clone()).render(&mut buffer)?;
        let subcmd_name = subcmd.get_name();
        fs::write(man_dir.join(format!("qa-report-{subcmd_name}.1")), &buffer)?;
    }

    // Generate markdown documentation
    let markdown = clap_markdown::help_markdown::<qa_report_cli_types::Cli>();
    fs::write(out_dir.join("manpage.md"), markdown)?;

    // Tell cargo to re-run this if the CLI definition changes
    println!("cargo:rerun-if-changed=../cli_types/src/lib.rs");

    Ok(())
}
