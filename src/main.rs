use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind};
use colored::Colorize;
use colored::control::set_override as set_color_override;
use lox_tester::backend::{ExternalInterpreter, Interpreter};
use lox_tester::config::{Settings, load_config, timeout_from_secs};
use lox_tester::corpus::{CorpusOptions, load_corpus};
use lox_tester::engine::run_suites;
use lox_tester::engine_async::run_suites_async;
use lox_tester::i18n;
use lox_tester::render::{RenderOptions, write_suites};
use lox_tester::report::{OutputKind, ReportOptions, print_human};
use lox_tester::types::TestSuite;
use lox_tester::{t, t_args};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Compact,
    Terse,
    Final,
    Normal,
}

impl From<OutputFormat> for OutputKind {
    fn from(v: OutputFormat) -> Self {
        match v {
            OutputFormat::Normal => OutputKind::Normal,
            OutputFormat::Compact => OutputKind::Compact,
            OutputFormat::Terse => OutputKind::Terse,
            OutputFormat::Final => OutputKind::Final,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, author, about = t!("cli-about"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short = 'v', long = "verbose", global = true, help = t!("cli-verbose"))]
    verbose: bool,

    #[arg(long = "no-color", global = true, help = t!("cli-no-color"))]
    no_color: bool,

    #[arg(long, value_name = "FILE", global = true, help = t!("cli-config"))]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = t!("cli-generate-about"))]
    Generate(GenerateArgs),
    #[command(about = t!("cli-run-about"))]
    Run(RunArgs),
}

/// Settings shared by both subcommands; each overrides the config file.
#[derive(Args, Debug)]
struct InterpreterArgs {
    #[arg(long, value_name = "CMD", visible_alias = "app", help = t!("cli-interpreter"))]
    interpreter: Option<String>,

    #[arg(long = "quiet-flag", value_name = "FLAG", allow_hyphen_values = true, help = t!("cli-quiet-flag"))]
    quiet_flag: Option<String>,

    #[arg(long, value_name = "EXT", help = t!("cli-extension"))]
    extension: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(value_name = "TEST_DIR")]
    test_dir: PathBuf,

    #[arg(value_name = "OUT_DIR")]
    out_dir: PathBuf,

    #[command(flatten)]
    interpreter: InterpreterArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(value_name = "TEST_DIR")]
    test_dir: PathBuf,

    #[command(flatten)]
    interpreter: InterpreterArgs,

    #[arg(long, value_name = "SECS", help = t!("cli-timeout"))]
    timeout: Option<f64>,

    #[arg(long, value_name = "REGEX", help = t!("cli-filter"))]
    filter: Option<String>,

    #[arg(long, help = t!("cli-list"))]
    list: bool,

    #[arg(long = "serial", help = t!("cli-serial"))]
    use_serial: bool,

    #[arg(short = 'j', long, value_name = "N", help = t!("cli-jobs"))]
    jobs: Option<usize>,

    #[arg(short = 'o', long = "output", value_enum, default_value = "normal", help = t!("cli-output"))]
    output: OutputFormat,

    #[arg(short = 'f', long = "hide-fails", conflicts_with = "hide_passes", help = t!("cli-hide-fails"))]
    hide_fails: bool,

    #[arg(short = 'p', long = "hide-passes", conflicts_with = "hide_fails", help = t!("cli-hide-passes"))]
    hide_passes: bool,
}

impl InterpreterArgs {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(i) = &self.interpreter {
            settings.interpreter = i.trim().to_string();
        }
        if let Some(q) = &self.quiet_flag {
            settings.quiet_flag = q.trim().to_string();
        }
        if let Some(e) = &self.extension {
            settings.extension = Some(e.trim().trim_start_matches('.').to_string());
        }
        settings
    }
}

/// Format CLI flags to be bold using regex matching
fn format_flags_bold(text: &str) -> String {
    match Regex::new(r"(?m)^(\s*)(--?\w+(?:-\w+)*)") {
        Ok(flag_regex) => flag_regex
            .replace_all(text, |caps: &regex::Captures| {
                format!("{}{}", &caps[1], caps[2].bold())
            })
            .to_string(),
        Err(_) => text.to_string(),
    }
}

/// Localize the section labels of clap's help and error output
fn format_clap_error(error: &clap::Error) -> String {
    let mut msg = if error.kind() == ErrorKind::DisplayHelp {
        Cli::command().render_long_help().to_string()
    } else {
        error.to_string()
    };
    msg = msg.replace("Usage:", &t!("cli-usage").bold().underline().to_string());
    msg = msg.replace("Commands:", &t!("cli-commands").bold().underline().to_string());
    msg = msg.replace("Arguments:", &t!("cli-arguments").bold().underline().to_string());
    msg = msg.replace("Options:", &t!("cli-options").bold().underline().to_string());
    msg = msg.replace("error:", &t!("cli-error-label").red().bold().to_string());
    format_flags_bold(&msg)
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayVersion | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                error.exit()
            }
            ErrorKind::DisplayHelp => {
                println!("{}", format_clap_error(&error));
                std::process::exit(0);
            }
            _ => {
                eprintln!("{}", format_clap_error(&error));
                std::process::exit(1);
            }
        },
    }
}

fn require_dir(path: &Path, key: &str) {
    if !path.is_dir() {
        error!("{}", t_args!(key, "dir" => path.display()));
        std::process::exit(2);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    i18n::init();
    let cli = parse_cli();

    // Without -v only warnings and errors; RUST_LOG always wins
    let filter = if cli.verbose {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "lox_tester=info".to_string())
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "lox_tester=warn".to_string())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    set_color_override(!cli.no_color);

    let mut settings = Settings::default();
    if let Some(raw) = load_config(cli.config.as_deref())? {
        settings = settings.with_config(&raw)?;
    }

    info!(
        "{}",
        t_args!("info-version",
            "name" => env!("CARGO_PKG_NAME"),
            "version" => env!("CARGO_PKG_VERSION")
        )
    );

    match &cli.command {
        Commands::Generate(args) => generate(args, args.interpreter.apply(settings)),
        Commands::Run(args) => {
            let mut settings = args.interpreter.apply(settings);
            if let Some(secs) = args.timeout {
                settings.timeout = Some(timeout_from_secs(secs)?);
            }
            run(args, settings, cli.verbose).await
        }
    }
}

fn generate(args: &GenerateArgs, settings: Settings) -> Result<()> {
    require_dir(&args.test_dir, "error-test-dir-missing");
    require_dir(&args.out_dir, "error-out-dir-missing");

    let suites = load_corpus(&args.test_dir, &CorpusOptions::from(&settings))?;
    let opts = RenderOptions {
        interpreter: settings.interpreter,
        quiet_flag: settings.quiet_flag,
    };
    for path in write_suites(&suites, &args.out_dir, &opts)? {
        println!("{}", t_args!("wrote-suite", "file" => path.display()));
    }
    Ok(())
}

fn filter_cases(suites: &mut Vec<TestSuite>, pattern: &str) -> Result<()> {
    let re = Regex::new(pattern)
        .with_context(|| t_args!("error-invalid-filter", "filter" => pattern))?;
    for suite in suites.iter_mut() {
        let name = suite.name.clone();
        suite
            .cases
            .retain(|c| re.is_match(&format!("{name}::{}", c.name)));
    }
    Ok(())
}

async fn run(args: &RunArgs, settings: Settings, verbose: bool) -> Result<()> {
    require_dir(&args.test_dir, "error-test-dir-missing");

    let mut suites = load_corpus(&args.test_dir, &CorpusOptions::from(&settings))?;
    if let Some(pattern) = &args.filter {
        filter_cases(&mut suites, pattern)?;
    }
    suites.retain(|s| !s.cases.is_empty());

    if args.list {
        println!("{}", t!("available-tests"));
        for suite in &suites {
            for case in &suite.cases {
                println!("  {}", suite.qualified_name(case));
            }
        }
        return Ok(());
    }
    if suites.is_empty() {
        error!("{}", t!("error-no-tests-after-filter"));
        std::process::exit(2);
    }

    let backend = ExternalInterpreter::from_settings(&settings);
    // Fail fast on a missing interpreter instead of failing every case
    if let Err(e) = backend.validate() {
        error!("{}", t_args!("error-validation-failed", "error" => e));
        std::process::exit(2);
    }
    if let Ok(path) = backend.resolve() {
        info!("{}", t_args!("info-interpreter", "path" => path.display()));
    }

    let case_count: usize = suites.iter().map(|s| s.cases.len()).sum();
    info!(
        "{}",
        t_args!("info-starting-tests", "count" => case_count, "suites" => suites.len())
    );

    let summary = if args.use_serial {
        run_suites(&backend, &suites)
    } else {
        let jobs = args.jobs.unwrap_or_else(num_cpus::get);
        run_suites_async(&backend, &suites, jobs).await
    };

    print_human(
        &summary,
        &ReportOptions {
            kind: args.output.into(),
            hide_passes: args.hide_passes,
            hide_fails: args.hide_fails,
            verbose,
        },
    );

    info!(
        "{}",
        t_args!("info-all-finished",
            "total" => summary.total,
            "passed" => summary.passed,
            "failed" => summary.failed
        )
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
