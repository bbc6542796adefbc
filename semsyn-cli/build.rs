use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the views from src/views.rs
// We need to duplicate this here since build scripts can't access src/ modules
const AVAILABLE_VIEWS: &[&str] = &["semantic", "syntax", "anchors", "bindings-json"];

fn binding_arg() -> Arg {
    Arg::new("binding")
        .help("Path to the binding sheet (CSV)")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("semsyn")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Map XML documents to tidy tables and back through a semantic binding sheet")
        .arg_required_else_help(true)
        .arg(
            Arg::new("list-dialects")
                .long("list-dialects")
                .help("List supported dialects")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a semsyn.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("dialect")
                .long("dialect")
                .value_parser(["JP-PINT", "SME-COMMON", "XBRL-GL", "ADC"])
                .global(true),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_parser(["semantic", "syntax"])
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the hierarchies of a binding sheet")
                .arg(binding_arg())
                .arg(
                    Arg::new("view")
                        .value_parser(clap::builder::PossibleValuesParser::new(AVAILABLE_VIEWS))
                        .index(2),
                ),
        )
        .subcommand(
            Command::new("complete")
                .about("Resolve every item of a document and write it back")
                .arg(binding_arg())
                .arg(Arg::new("input").required(true).index(2).value_hint(ValueHint::FilePath))
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("to-tidy")
                .about("Flatten XML documents into a tidy table")
                .arg(binding_arg())
                .arg(
                    Arg::new("inputs")
                        .required(true)
                        .num_args(1..)
                        .index(2)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(output_arg())
                .arg(Arg::new("append").long("append").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("to-xml")
                .about("Rebuild XML documents from a tidy table")
                .arg(binding_arg())
                .arg(Arg::new("input").required(true).index(2).value_hint(ValueHint::FilePath))
                .arg(
                    Arg::new("skeleton")
                        .long("skeleton")
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .required(true)
                        .value_hint(ValueHint::DirPath),
                ),
        )
        .subcommand(
            Command::new("reorder")
                .about("Rewrite a tidy table with bound columns in syntax order")
                .arg(binding_arg())
                .arg(Arg::new("input").required(true).index(2).value_hint(ValueHint::FilePath))
                .arg(output_arg()),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "semsyn", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "semsyn", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "semsyn", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
