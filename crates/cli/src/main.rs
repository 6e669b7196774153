// tagcalc CLI - headless formula editor
// Replays key scripts, evaluates exported token lists, runs suggestion lookups.

mod exit_codes;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use tagcalc_cli::replay::{replay, ReplayOptions, Report};
use tagcalc_cli::script;
use tagcalc_config::{Catalog, ConfigError, Settings};
use tagcalc_engine::classify::parse_number;
use tagcalc_engine::formula::eval::expression_source;
use tagcalc_engine::{evaluate, FormulaEditor, SuggestionProvider, Token, TokenSequence, INVALID_EXPRESSION};

use exit_codes::{EXIT_INVALID, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tagcalc")]
#[command(about = "Token-based formula editor (headless)")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "TAGCALC_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log engine activity to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CatalogArgs {
    /// Catalog TOML with `suggestions` and `[variables]` (defaults to the demo catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Bind a variable, overriding the catalog (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Type a key script into the editor and print the result
    #[command(after_help = "\
Named keys: {enter} {tab} {bs} {esc} {up} {down}; {{ and }} type a literal brace.

Examples:
  tagcalc calc '2+3*4'
  tagcalc calc '@rev{tab}-@rent{enter}'
  tagcalc calc 'x*y' --var x=3 --var y=4 --json")]
    Calc {
        /// Key script
        script: String,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Leave trailing pending text uncommitted
        #[arg(long)]
        keep_pending: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate an exported token list (JSON file, or - for stdin)
    #[command(after_help = "\
Accepts a token array or the object printed by `calc --json`.

Examples:
  tagcalc eval tokens.json
  tagcalc calc '@sales*2' --json | tagcalc eval -")]
    Eval {
        input: PathBuf,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List catalog labels matching a query
    Suggest {
        query: String,

        /// Catalog TOML (defaults to the demo catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Maximum number of candidates (defaults to autocomplete.maxCandidates)
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    let result = match cli.command {
        Commands::Calc { script, catalog, keep_pending, json } => {
            cmd_calc(&settings, script, catalog, keep_pending, json)
        }
        Commands::Eval { input, catalog, json } => cmd_eval(input, catalog, json),
        Commands::Suggest { query, catalog, limit, json } => {
            cmd_suggest(&settings, query, catalog, limit, json)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Result already printed; only the exit code is left to report.
    pub fn invalid() -> Self {
        Self { code: EXIT_INVALID, message: String::new(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { .. } => Self::io(err.to_string()),
            _ => Self::parse(err.to_string()),
        }
    }
}

// ============================================================================
// shared
// ============================================================================

fn load_catalog(args: &CatalogArgs) -> Result<Catalog, CliError> {
    let mut catalog = match &args.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };
    for var in &args.vars {
        let (name, value) = parse_var(var)?;
        catalog.variables.insert(name, value);
    }
    Ok(catalog)
}

fn parse_var(arg: &str) -> Result<(String, f64), CliError> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| CliError::args(format!("--var {:?}: expected NAME=VALUE", arg)))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::args(format!("--var {:?}: empty name", arg)));
    }
    let value = value.trim();
    let value = parse_number(value)
        .ok_or_else(|| CliError::args(format!("--var {:?}: {:?} is not a finite number", arg, value)))?;
    Ok((name.to_string(), value))
}

fn write_out(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", text).map_err(|e| CliError::io(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::parse(e.to_string()))
}

// ============================================================================
// calc
// ============================================================================

fn cmd_calc(
    settings: &Settings,
    script: String,
    catalog: CatalogArgs,
    keep_pending: bool,
    json: bool,
) -> Result<(), CliError> {
    let keys = script::parse(&script).map_err(|e| {
        CliError::args(e.to_string()).with_hint("named keys: {enter} {tab} {bs} {esc} {up} {down}")
    })?;
    let catalog = load_catalog(&catalog)?;

    let editor = FormulaEditor::with_options(catalog.bindings(), settings.editor_options());
    let provider: Arc<dyn SuggestionProvider> = Arc::new(catalog.provider());
    let options = ReplayOptions { debounce: settings.debounce(), keep_pending };
    let report = replay(editor, provider, &keys, &options);

    if json {
        write_out(&to_json(&report)?)?;
    } else {
        write_report(&report)?;
    }

    if report.result == INVALID_EXPRESSION {
        return Err(CliError::invalid());
    }
    Ok(())
}

fn write_report(report: &Report) -> Result<(), CliError> {
    if !report.expression.is_empty() {
        write_out(&report.expression)?;
    }
    write_out(&format!("= {}", report.result))?;
    if !report.pending.is_empty() {
        write_out(&format!("pending: {}", report.pending))?;
    }
    if !report.candidates.is_empty() {
        write_out(&format!("candidates: {}", report.candidates.join(", ")))?;
    }
    Ok(())
}

// ============================================================================
// eval
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenInput {
    List(Vec<Token>),
    Report { tokens: Vec<Token> },
}

#[derive(Serialize)]
struct EvalOutput {
    source: String,
    result: String,
}

fn cmd_eval(input: PathBuf, catalog: CatalogArgs, json: bool) -> Result<(), CliError> {
    let text = read_input(&input)?;
    let tokens = match serde_json::from_str::<TokenInput>(&text) {
        Ok(TokenInput::List(tokens)) | Ok(TokenInput::Report { tokens }) => tokens,
        Err(e) => {
            return Err(CliError::parse(format!("{}: {}", input.display(), e))
                .with_hint("expected a token array or the output of `tagcalc calc --json`"))
        }
    };
    let sequence = TokenSequence::from_tokens(tokens)
        .map_err(|e| CliError::parse(format!("{}: {}", input.display(), e)))?;
    let bindings = load_catalog(&catalog)?.bindings();

    let output = EvalOutput {
        source: expression_source(sequence.tokens(), &bindings),
        result: evaluate(sequence.tokens(), &bindings),
    };

    if json {
        write_out(&to_json(&output)?)?;
    } else {
        write_out(&output.result)?;
    }

    if output.result == INVALID_EXPRESSION {
        return Err(CliError::invalid());
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

// ============================================================================
// suggest
// ============================================================================

fn cmd_suggest(
    settings: &Settings,
    query: String,
    catalog: Option<PathBuf>,
    limit: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let catalog = match catalog {
        Some(path) => Catalog::load(&path)?,
        None => Catalog::default(),
    };
    let provider = catalog.provider();
    let mut candidates = smol::block_on(provider.suggest(&query))
        .map_err(|e| CliError::io(e.to_string()))?;
    if let Some(max) = limit.or(settings.max_candidates) {
        candidates.truncate(max);
    }

    if json {
        write_out(&to_json(&candidates)?)?;
    } else {
        for candidate in &candidates {
            write_out(&candidate.label)?;
        }
    }
    Ok(())
}
