//! overexported - report exported identifiers that could be unexported.
//!
//! Loads a program, computes reachability from its executable packages,
//! and reports every exported function, method, type, variable, or
//! constant with no reference from outside its declaring package. An
//! identifier being reported does not make unexporting unconditionally
//! safe - an over-exported function may be referenced by another
//! over-exported function - so some judgement is required.

use clap::Parser;
use deadwood::analysis;
use deadwood::error::{Error, Result};
use deadwood::filter::{PackageFilter, MODULE_SENTINEL};
use deadwood::load::{self, LoadOptions};
use deadwood::report::{self, template::Template};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

/// Report exported identifiers only used inside their own package.
#[derive(Parser, Debug)]
#[command(name = "overexported")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Include test variants as first-class packages
    #[arg(long)]
    test: bool,

    /// Comma-separated list of extra build tags
    #[arg(long, value_name = "CSV", default_value = "")]
    tags: String,

    /// Report only packages matching this regular expression
    /// (default: the modules of the listed packages)
    #[arg(long, value_name = "REGEX", default_value = MODULE_SENTINEL)]
    filter: String,

    /// Include exports declared in generated files
    #[arg(long)]
    generated: bool,

    /// Exclude packages matching this pattern; can be repeated
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Emit JSON records
    #[arg(long)]
    json: bool,

    /// Format each record through a template with {field} placeholders;
    /// mutually exclusive with --json
    #[arg(short = 'f', value_name = "TEMPLATE")]
    format: Option<String>,

    /// Change to this directory before loading
    #[arg(short = 'C', value_name = "DIR")]
    chdir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,

    /// Package patterns to analyze
    #[arg(required = true, value_name = "PATTERN")]
    patterns: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(&cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let template = match &cli.format {
        Some(_) if cli.json => {
            return Err(Error::Usage(
                "you cannot specify both -f=template and --json".into(),
            ));
        }
        Some(text) => {
            Some(Template::parse(text).map_err(|e| Error::Usage(format!("invalid -f: {e}")))?)
        }
        None => None,
    };

    if let Some(dir) = &cli.chdir {
        std::env::set_current_dir(dir)
            .map_err(|e| Error::Load(format!("chdir {}: {e}", dir.display())))?;
    }

    let opts = LoadOptions {
        tests: cli.test,
        tags: parse_tags(&cli.tags),
        dir: PathBuf::new(),
    };
    let loaded = load::load(&cli.patterns, &opts)?;
    let program = &loaded.program;

    // The packages whose exports are under scrutiny; the rest of the
    // loaded program only contributes witnesses.
    let targets: HashSet<String> = loaded
        .initial
        .iter()
        .map(|&pkg| program.package(pkg).path.clone())
        .collect();

    let filter = PackageFilter::new(&cli.filter, program, &loaded.initial)?;
    let roots = analysis::collect_roots(program, &loaded.initial)?;
    let rta = analysis::analyze(program, &roots, true)?;
    let graph = rta
        .call_graph
        .as_ref()
        .ok_or_else(|| Error::AnalysisFailed("call graph missing".into()))?;

    let index = analysis::build_index(program);
    let usage = analysis::build_usage(program, &rta, graph, &targets, cli.test);
    info!(targets = targets.len(), "usage index ready");

    let exports = analysis::over_exported(
        program,
        &index,
        &usage,
        &targets,
        cli.generated,
        &filter,
        &cli.exclude,
    );
    let records = report::exports_to_json(&exports);

    if cli.json {
        println!("{}", serde_json::to_string(&records).expect("serializable records"));
    } else if let Some(template) = &template {
        for record in &records {
            let value = serde_json::to_value(record).expect("serializable records");
            print!("{}", template.render(&value));
        }
    } else {
        print!("{}", report::render_exports_text(&records));
    }
    Ok(())
}

fn parse_tags(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
