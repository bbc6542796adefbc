// Command-line interface for semsyn
//
// This binary reads a binding sheet (a CSV listing the items of a semantic model and
// where each item lives in an XML syntax) and uses it to move data between XML documents
// and flat tidy tables.
//
// The inspect command shows the hierarchies rebuilt from the sheet. It is the first thing
// to run when a sheet misbehaves: missing ancestors and unbound items show up as warnings
// and as gaps in the tree.
//
// Usage:
//  semsyn inspect <binding> [<view>]                         - Render the forests (defaults to "semantic")
//  semsyn complete <binding> <xml> [-o <out.xml>]            - Resolve every item, synthesizing defaults in syntax mode
//  semsyn to-tidy <binding> <xml>... [-o <out.csv>] [--append]  - Flatten documents into one tidy table
//  semsyn to-xml <binding> <tidy.csv> --skeleton <xml> --out-dir <dir>  - Rebuild one document per table document
//  semsyn reorder <binding> <tidy.csv> [-o <out.csv>]        - Sort bound columns into syntax order
//  semsyn --list-dialects                                    - List supported dialects
//
// Configuration:
//
// Settings come from the embedded defaults, then ./semsyn.toml when present, then the file
// given with --config, then --dialect / --mode. Log verbosity follows RUST_LOG when set,
// otherwise -v (info), -vv (debug), -vvv (trace); warnings are always shown.

mod views;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use semsyn_config::{delimiter_byte, Loader, SemsynConfig, LOCAL_CONFIG_FILE};
use semsyn_core::sheet;
use semsyn_core::tidy::assemble::DocumentAssembler;
use semsyn_core::tidy::export::TidyExporter;
use semsyn_core::tidy::io::{read_rows_from_path, write_rows, write_rows_to_path};
use semsyn_core::{
    BindingContext, Dialect, DialectSettings, Document, DocumentMapper, TidyTable,
};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

fn binding_arg() -> Arg {
    Arg::new("binding")
        .help("Path to the binding sheet (CSV)")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .help(help)
        .value_hint(ValueHint::FilePath)
}

fn build_cli() -> Command {
    Command::new("semsyn")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Map XML documents to tidy tables and back through a semantic binding sheet")
        .long_about(
            "semsyn reads a binding sheet that relates the items of a semantic model to\n\
            their location in an XML syntax, and converts between documents and tables.\n\n\
            Commands:\n  \
            - inspect:  View the semantic or syntax hierarchy of a binding sheet\n  \
            - complete: Resolve a document, adding default values in syntax mode\n  \
            - to-tidy:  Flatten documents into a tidy table\n  \
            - to-xml:   Rebuild documents from a tidy table\n  \
            - reorder:  Rewrite a tidy table with columns in syntax order\n\n\
            Examples:\n  \
            semsyn inspect bindings.csv syntax\n  \
            semsyn --mode syntax complete bindings.csv invoice.xml -o completed.xml\n  \
            semsyn to-tidy bindings.csv a.xml b.xml -o invoices.csv\n  \
            semsyn to-xml bindings.csv invoices.csv --skeleton empty.xml --out-dir out",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
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
                .value_name("PATH")
                .help("Path to a semsyn.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("dialect")
                .long("dialect")
                .value_name("TAG")
                .help("Dialect of the binding sheet (JP-PINT, SME-COMMON, XBRL-GL, ADC)")
                .value_hint(ValueHint::Other)
                .global(true),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("semantic (read only) or syntax (synthesize missing defaults)")
                .value_parser(clap::builder::PossibleValuesParser::new(["semantic", "syntax"]))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase log output (repeatable)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the hierarchies of a binding sheet")
                .long_about(
                    "Render the forests rebuilt from a binding sheet.\n\n\
                    Views:\n  \
                    - semantic:      semantic forest (default)\n  \
                    - syntax:        syntax forest\n  \
                    - anchors:       semantic forest with inferred anchor paths\n  \
                    - bindings-json: bound bindings as JSON",
                )
                .arg(binding_arg())
                .arg(
                    Arg::new("view")
                        .help("View to render. Defaults to 'semantic'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            views::AVAILABLE_VIEWS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("complete")
                .about("Resolve every item of a document and write it back")
                .arg(binding_arg())
                .arg(
                    Arg::new("input")
                        .help("XML document")
                        .required(true)
                        .index(2)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(output_arg("Output file path (defaults to stdout)")),
        )
        .subcommand(
            Command::new("to-tidy")
                .about("Flatten XML documents into a tidy table")
                .arg(binding_arg())
                .arg(
                    Arg::new("inputs")
                        .help("XML documents")
                        .required(true)
                        .num_args(1..)
                        .index(2)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(output_arg("Output CSV path (defaults to stdout)"))
                .arg(
                    Arg::new("append")
                        .long("append")
                        .help("Append rows to an existing output file")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("to-xml")
                .about("Rebuild XML documents from a tidy table")
                .arg(binding_arg())
                .arg(
                    Arg::new("input")
                        .help("Tidy table (CSV)")
                        .required(true)
                        .index(2)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("skeleton")
                        .long("skeleton")
                        .help("Empty document carrying the root element and namespace declarations")
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .help("Directory receiving one <document>.xml per table document")
                        .required(true)
                        .value_hint(ValueHint::DirPath),
                ),
        )
        .subcommand(
            Command::new("reorder")
                .about("Rewrite a tidy table with bound columns in syntax order")
                .arg(binding_arg())
                .arg(
                    Arg::new("input")
                        .help("Tidy table (CSV)")
                        .required(true)
                        .index(2)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(output_arg("Output CSV path (defaults to stdout)")),
        )
}

fn main() {
    let matches = build_cli().get_matches();

    init_tracing(matches.get_count("verbose"));

    if matches.get_flag("list-dialects") {
        handle_list_dialects_command();
        return;
    }

    let config = load_cli_config(&matches);
    let settings = config
        .dialect
        .settings()
        .unwrap_or_else(|e| fatal(e));

    match matches.subcommand() {
        Some(("inspect", sub_matches)) => {
            let view = sub_matches
                .get_one::<String>("view")
                .map(|s| s.as_str())
                .unwrap_or(views::DEFAULT_VIEW);
            let ctx = load_context(required(sub_matches, "binding"), &config, settings);
            handle_inspect_command(&ctx, view);
        }
        Some(("complete", sub_matches)) => {
            let ctx = load_context(required(sub_matches, "binding"), &config, settings);
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_complete_command(&ctx, required(sub_matches, "input"), output, &config);
        }
        Some(("to-tidy", sub_matches)) => {
            let ctx = load_context(required(sub_matches, "binding"), &config, settings);
            let inputs: Vec<&str> = sub_matches
                .get_many::<String>("inputs")
                .map(|values| values.map(|s| s.as_str()).collect())
                .unwrap_or_default();
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            let append = sub_matches.get_flag("append") || config.tidy.append;
            handle_to_tidy_command(&ctx, &inputs, output, append, &config);
        }
        Some(("to-xml", sub_matches)) => {
            let ctx = load_context(required(sub_matches, "binding"), &config, settings);
            handle_to_xml_command(
                &ctx,
                required(sub_matches, "input"),
                required(sub_matches, "skeleton"),
                Path::new(required(sub_matches, "out-dir")),
                &config,
            );
        }
        Some(("reorder", sub_matches)) => {
            let ctx = load_context(required(sub_matches, "binding"), &config, settings);
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_reorder_command(&ctx, required(sub_matches, "input"), output, &config);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

/// Print an error and exit with status 1
fn fatal(message: impl Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// Value of an argument clap already enforces as required
fn required<'m>(matches: &'m ArgMatches, name: &str) -> &'m str {
    matches
        .get_one::<String>(name)
        .map(|s| s.as_str())
        .unwrap_or_else(|| fatal(format!("missing argument '{name}'")))
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_cli_config(matches: &ArgMatches) -> SemsynConfig {
    let loader = Loader::new().with_optional_file(LOCAL_CONFIG_FILE);
    let mut loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader,
    };
    for (flag, key) in [("dialect", "dialect.name"), ("mode", "dialect.mode")] {
        if let Some(value) = matches.get_one::<String>(flag) {
            loader = loader
                .set_override(key, value.as_str())
                .unwrap_or_else(|err| fatal(format!("invalid --{flag}: {err}")));
        }
    }
    loader
        .build()
        .unwrap_or_else(|err| fatal(format!("failed to load configuration: {err}")))
}

fn delimiter(value: char, key: &str) -> u8 {
    delimiter_byte(value)
        .unwrap_or_else(|| fatal(format!("{key} must be a single ASCII character, got '{value}'")))
}

fn load_context(path: &str, config: &SemsynConfig, settings: DialectSettings) -> BindingContext {
    let registry = sheet::load_path(path, delimiter(config.binding.delimiter, "binding.delimiter"))
        .unwrap_or_else(|e| fatal(e));
    BindingContext::build(registry, settings)
}

fn read_document(path: &str) -> Document {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| fatal(format!("cannot read '{path}': {e}")));
    Document::parse(&text).unwrap_or_else(|e| fatal(format!("{path}: {e}")))
}

fn read_table(path: &str, ctx: &BindingContext, config: &SemsynConfig) -> TidyTable {
    let raw = read_rows_from_path(path, delimiter(config.tidy.delimiter, "tidy.delimiter"))
        .unwrap_or_else(|e| fatal(e));
    let mut diagnostics = Vec::new();
    let table = TidyTable::ingest(
        &raw,
        ctx.registry(),
        &config.tidy.descriptive_prefix,
        &mut diagnostics,
    );
    tracing::info!(
        rows = table.len(),
        columns = table.header.len(),
        skipped = diagnostics.len(),
        "tidy table read"
    );
    table
}

fn write_table(rows: &[Vec<String>], output: Option<&str>, append: bool, config: &SemsynConfig) {
    let delimiter = delimiter(config.tidy.delimiter, "tidy.delimiter");
    let result = match output {
        Some(path) => write_rows_to_path(rows, path, delimiter, append),
        None => write_rows(rows, std::io::stdout().lock(), delimiter),
    };
    result.unwrap_or_else(|e| fatal(e));
}

/// Handle the inspect command
fn handle_inspect_command(ctx: &BindingContext, view: &str) {
    let output = views::execute_view(ctx, view).unwrap_or_else(|e| fatal(e));
    print!("{output}");
}

/// Handle the complete command
fn handle_complete_command(
    ctx: &BindingContext,
    input: &str,
    output: Option<&str>,
    config: &SemsynConfig,
) {
    let mut mapper = DocumentMapper::new(ctx, read_document(input));
    mapper.resolve_tree().unwrap_or_else(|e| fatal(e));
    tracing::info!(
        input,
        synthesized = mapper.synthesized(),
        findings = mapper.diagnostics().len(),
        "document completed"
    );

    let text = mapper
        .into_document()
        .to_xml_string(config.output.indent)
        .unwrap_or_else(|e| fatal(e));
    match output {
        Some(path) => fs::write(path, text)
            .unwrap_or_else(|e| fatal(format!("cannot write '{path}': {e}"))),
        None => print!("{text}"),
    }
}

/// Handle the to-tidy command
fn handle_to_tidy_command(
    ctx: &BindingContext,
    inputs: &[&str],
    output: Option<&str>,
    append: bool,
    config: &SemsynConfig,
) {
    let mut exporter = TidyExporter::new(ctx, &config.tidy.descriptive_prefix);
    for input in inputs {
        let mut mapper = DocumentMapper::new(ctx, read_document(input));
        let rows = exporter
            .add_document(&mut mapper)
            .unwrap_or_else(|e| fatal(format!("{input}: {e}")));
        tracing::info!(input, rows, "document flattened");
    }
    let table = exporter.finish();
    write_table(&table.to_rows(), output, append, config);
}

/// Handle the to-xml command
fn handle_to_xml_command(
    ctx: &BindingContext,
    input: &str,
    skeleton: &str,
    out_dir: &Path,
    config: &SemsynConfig,
) {
    let table = read_table(input, ctx, config);
    let mut assembler =
        DocumentAssembler::new(ctx, read_document(skeleton), &config.tidy.descriptive_prefix);
    let documents = assembler.assemble(&table).unwrap_or_else(|e| fatal(e));

    // Every document is rendered before the first file is written.
    let rendered: Vec<(String, String)> = documents
        .into_iter()
        .map(|assembled| {
            let text = assembled
                .document
                .to_xml_string(config.output.indent)
                .unwrap_or_else(|e| fatal(format!("document {}: {e}", assembled.key)));
            (assembled.key, text)
        })
        .collect();

    fs::create_dir_all(out_dir)
        .unwrap_or_else(|e| fatal(format!("cannot create '{}': {e}", out_dir.display())));
    for (key, text) in rendered {
        let path = document_file(out_dir, &key);
        fs::write(&path, text)
            .unwrap_or_else(|e| fatal(format!("cannot write '{}': {e}", path.display())));
        tracing::info!(document = %key, path = %path.display(), "document written");
    }
}

/// Handle the reorder command
fn handle_reorder_command(
    ctx: &BindingContext,
    input: &str,
    output: Option<&str>,
    config: &SemsynConfig,
) {
    let table = read_table(input, ctx, config);
    write_table(&table.to_rows(), output, false, config);
}

/// Handle the list-dialects command
fn handle_list_dialects_command() {
    println!("Available dialects:\n");
    for dialect in Dialect::ALL {
        println!("  {:<12}{}", dialect.tag(), dialect.description());
    }
}

/// `<out_dir>/<key>.xml`, with characters that cannot appear in a file name replaced
fn document_file(out_dir: &Path, key: &str) -> PathBuf {
    let name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = if name.trim_matches('.').is_empty() {
        "document".to_string()
    } else {
        name
    };
    out_dir.join(format!("{name}.xml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_file_keeps_plain_keys() {
        let path = document_file(Path::new("out"), "INV-100");
        assert_eq!(path, Path::new("out").join("INV-100.xml"));
    }

    #[test]
    fn test_document_file_replaces_separators() {
        let path = document_file(Path::new("out"), "a/b c");
        assert_eq!(path, Path::new("out").join("a_b_c.xml"));
        let path = document_file(Path::new("out"), "..");
        assert_eq!(path, Path::new("out").join("document.xml"));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from([
                "semsyn", "inspect", "b.csv", "syntax", "--dialect", "ADC", "-vv",
            ])
            .unwrap();
        assert_eq!(matches.get_one::<String>("dialect").unwrap(), "ADC");
        assert_eq!(matches.get_count("verbose"), 2);
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "inspect");
        assert_eq!(sub.get_one::<String>("view").unwrap(), "syntax");
    }

    #[test]
    fn test_to_tidy_takes_many_inputs() {
        let matches = build_cli()
            .try_get_matches_from(["semsyn", "to-tidy", "b.csv", "a.xml", "c.xml", "--append"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let inputs: Vec<&String> = sub.get_many::<String>("inputs").unwrap().collect();
        assert_eq!(inputs, vec!["a.xml", "c.xml"]);
        assert!(sub.get_flag("append"));
    }
}
