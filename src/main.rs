mod cli;
mod color;
mod data;
mod overlap;
mod pipeline;
mod prompt;
mod venn;

use std::io::IsTerminal;
use std::path::Path;

use clap::Parser;
use log::{error, info};

use cli::ArgParser;
use prompt::{Console, Interactive, Scripted};

fn main() {
    let args = ArgParser::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .init();

    if !args.validate() {
        error!("please fix arguments");
        std::process::exit(1);
    }

    let mut console: Box<dyn Console> = if std::io::stdin().is_terminal() {
        match Interactive::new() {
            Ok(c) => Box::new(c),
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        }
    } else {
        Box::new(Scripted::new(std::io::stdin().lock(), std::io::stdout()))
    };

    match pipeline::run(&args, console.as_mut(), Path::new(".")) {
        Ok(written) => info!(
            "outputs: {}, {}, {}",
            written.table.display(),
            written.diagram.display(),
            written.summary.display()
        ),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}
