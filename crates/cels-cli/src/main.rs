mod pipeline;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command, value_parser};

fn build_cli() -> Command {
    Command::new("celsc")
        .about("Compiles Celesta sources to C++")
        .arg(
            Arg::new("dir")
                .short('d')
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Source directory"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Output C++ file"),
        )
        .arg(
            Arg::new("header_system")
                .long("he")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Add #include <NAME> to the prologue"),
        )
        .arg(
            Arg::new("header_local")
                .long("hi")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Add #include \"NAME\" to the prologue"),
        )
        .arg(
            Arg::new("table_cache")
                .long("lr1-cache")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("LR(1) table cache file (default <DIR>/cels_lr1.tbl)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log pipeline stages to stderr"),
        )
}

fn main() -> ExitCode {
    let matches = build_cli().get_matches();

    if matches.get_flag("verbose") {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let dir = matches
        .get_one::<PathBuf>("dir")
        .expect("required argument")
        .clone();
    let output = matches
        .get_one::<PathBuf>("output")
        .expect("required argument")
        .clone();
    let collect = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };

    let options = pipeline::Options {
        dir: dir.clone(),
        output,
        system_includes: collect("header_system"),
        local_includes: collect("header_local"),
        table_cache: matches
            .get_one::<PathBuf>("table_cache")
            .cloned()
            .unwrap_or_else(|| dir.join("cels_lr1.tbl")),
    };

    match pipeline::run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprint!("{}", report::render(&error));
            ExitCode::FAILURE
        }
    }
}
