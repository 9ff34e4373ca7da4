#![allow(clippy::print_stderr)]

use anyhow::Result;
use clap::Parser;

use tsz_cli::args::CliArgs;
use tsz_cli::driver;

fn main() -> Result<()> {
    tsz_auto_import::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let report = match driver::run(&args) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };

    let output = if args.json {
        driver::render_json(&report)?
    } else {
        driver::render_text(&report)
    };
    println!("{}", output.trim_end());
    Ok(())
}
