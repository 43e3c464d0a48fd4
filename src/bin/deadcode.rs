//! deadcode - report source-level functions unreachable from any program
//! entry point.

use clap::Parser;
use deadwood::analysis;
use deadwood::error::{Error, Result};
use deadwood::filter::{PackageFilter, MODULE_SENTINEL};
use deadwood::load::{self, LoadOptions};
use deadwood::report::{self, template::Template};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Report unreachable functions in a program.
#[derive(Parser, Debug)]
#[command(name = "deadcode")]
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

    /// Include dead functions declared in generated files
    #[arg(long)]
    generated: bool,

    /// Show a path from an entry point to the named function
    #[arg(long, value_name = "NAME")]
    whylive: Option<String>,

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
    // Reject bad output options before doing any work.
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

    let filter = PackageFilter::new(&cli.filter, program, &loaded.initial)?;
    let roots = analysis::collect_roots(program, &loaded.initial)?;
    info!(roots = roots.len(), "entry points selected");

    // A call graph is only needed to explain a path.
    let rta = analysis::analyze(program, &roots, cli.whylive.is_some())?;
    let index = analysis::build_index(program);

    if let Some(target) = &cli.whylive {
        let graph = rta
            .call_graph
            .as_ref()
            .ok_or_else(|| Error::AnalysisFailed("call graph missing".into()))?
            .without_synthetic(program);
        let (root, path) = analysis::why_live(program, &graph, &roots, &index, &rta, target)?;
        let edges = report::edges_to_json(program, root, &path);
        if cli.json {
            println!("{}", serde_json::to_string(&edges).expect("serializable records"));
        } else if let Some(template) = &template {
            for edge in &edges {
                let record = serde_json::to_value(edge).expect("serializable records");
                print!("{}", template.render(&record));
            }
        } else {
            print!("{}", report::render_edges_text(&edges));
        }
        return Ok(());
    }

    let dead = analysis::dead_functions(program, &index, &rta, cli.generated);
    let packages = report::group_dead(program, &dead, &filter);

    if cli.json {
        println!("{}", serde_json::to_string(&packages).expect("serializable records"));
    } else if let Some(template) = &template {
        for pkg in &packages {
            for func in &pkg.funcs {
                let mut record = serde_json::to_value(func).expect("serializable records");
                record["Package"] = json!(pkg.name);
                record["Path"] = json!(pkg.path);
                print!("{}", template.render(&record));
            }
        }
    } else {
        print!("{}", report::render_dead_text(&packages));
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
