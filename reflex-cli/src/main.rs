//! Reflex CLI
//!
//! Validate pattern sets, try frames against them, and dump pipeline stages.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reflex_regex::{
    determinize_bounded, minimize, CompiledMatcher, Compiler, CompilerConfig, Nfa, RegexError,
    Symbol,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "reflexc")]
#[command(about = "Reflex pattern compiler - check, match and visualize byte patterns", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a pattern file and report per-stage state counts
    Check {
        /// Pattern file (JSON)
        file: PathBuf,

        /// Use the character alphabet instead of hex bytes
        #[arg(long)]
        chars: bool,
    },

    /// Run one input against a pattern file
    Match {
        /// Pattern file (JSON)
        file: PathBuf,

        /// Hex bytes such as "00 AA 00", or text with --chars
        input: String,

        #[arg(long)]
        chars: bool,
    },

    /// Print a pipeline stage as a Graphviz graph
    Dot {
        /// Pattern file (JSON)
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "table")]
        stage: Stage,

        #[arg(long)]
        chars: bool,
    },

    /// Write the compiled byte table as JSON
    Emit {
        /// Pattern file (JSON)
        file: PathBuf,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        chars: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Nfa,
    Dfa,
    Min,
    Table,
}

/// `{ "config": {...}, "patterns": [{ "pattern": "00 AA", "tag": "on" }] }`
#[derive(Debug, Deserialize)]
struct PatternFile {
    #[serde(default)]
    config: CompilerConfig,
    patterns: Vec<PatternEntry>,
}

#[derive(Debug, Deserialize)]
struct PatternEntry {
    pattern: String,
    tag: String,
}

impl PatternFile {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid pattern file {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn entries(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.patterns
            .iter()
            .map(|entry| (entry.pattern.as_str(), entry.tag.clone()))
    }

    fn compile(&self, chars: bool) -> Result<CompiledMatcher<String>> {
        let compiler = Compiler::new(self.config.clone());
        let result = if chars {
            compiler.compile_chars(self.entries())
        } else {
            compiler.compile(self.entries())
        };
        result.map_err(describe)
    }
}

/// Attach the caret line to syntax errors
fn describe(err: RegexError) -> anyhow::Error {
    if let RegexError::Syntax { source, .. } = &err {
        return anyhow::anyhow!("{}\n{}", err, source.caret());
    }
    err.into()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    match cli.command {
        Commands::Check { file, chars } => check(&file, chars),
        Commands::Match { file, input, chars } => run_match(&file, &input, chars),
        Commands::Dot { file, stage, chars } => dot(&file, stage, chars),
        Commands::Emit {
            file,
            output,
            chars,
        } => emit(&file, output.as_deref(), chars),
    }
}

fn setup_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

fn check(path: &Path, chars: bool) -> Result<()> {
    let file = PatternFile::load(path)?;
    let matcher = file.compile(chars)?;
    let stats = matcher.stats();

    info!(patterns = stats.patterns, "Pattern file compiled");
    println!("patterns:         {}", stats.patterns);
    println!("nfa states:       {}", stats.nfa_states);
    println!("dfa states:       {}", stats.dfa_states);
    println!("minimized states: {}", stats.minimized_states);
    println!("table states:     {}", stats.table_states);
    println!("table transitions: {}", matcher.table().transition_count());

    Ok(())
}

/// Decode `"00 AA 0d"` or `"00aa0d"` into bytes
fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("Odd number of hex digits in input '{}'", input);
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text: String = pair.iter().collect();
            // from_str_radix alone would take a sign such as "+1"
            if !pair.iter().all(char::is_ascii_hexdigit) {
                bail!("Invalid hex byte '{}'", text);
            }
            u8::from_str_radix(&text, 16).with_context(|| format!("Invalid hex byte '{}'", text))
        })
        .collect()
}

fn run_match(path: &Path, input: &str, chars: bool) -> Result<()> {
    let file = PatternFile::load(path)?;
    let matcher = file.compile(chars)?;
    let bytes = if chars {
        input.as_bytes().to_vec()
    } else {
        parse_hex(input)?
    };

    let report = matcher.explain(&bytes);
    if report.matched {
        for tag in report.tags {
            println!("{}", tag);
        }
        return Ok(());
    }

    match &report.failure {
        Some(failure) => {
            let expected: Vec<String> = failure
                .expected
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect();
            println!(
                "no match: byte {:02X} at offset {} has no transition",
                failure.byte, failure.offset
            );
            if expected.is_empty() {
                println!("expected: end of input");
            } else {
                println!("expected: {}", expected.join(" "));
            }
        }
        None => println!(
            "no match: input ended after {} bytes in a non-accepting state",
            report.consumed
        ),
    }

    bail!("No pattern matched")
}

fn stage_dot<S: Symbol>(nfa: Nfa<S, String>, stage: Stage, config: &CompilerConfig) -> Result<String> {
    if stage == Stage::Nfa {
        return Ok(nfa.to_dot());
    }

    let dfa = determinize_bounded(&nfa, config.max_dfa_states)?;
    Ok(match stage {
        Stage::Min => minimize(&dfa).to_dot(),
        _ => dfa.to_dot(),
    })
}

fn dot(path: &Path, stage: Stage, chars: bool) -> Result<()> {
    let file = PatternFile::load(path)?;
    let compiler = Compiler::new(file.config.clone());

    let graph = match (stage, chars) {
        (Stage::Table, _) => file.compile(chars)?.to_dot(),
        (_, true) => stage_dot(
            compiler.build_nfa_chars(file.entries()).map_err(describe)?,
            stage,
            &file.config,
        )?,
        (_, false) => stage_dot(
            compiler.build_nfa(file.entries()).map_err(describe)?,
            stage,
            &file.config,
        )?,
    };

    println!("{}", graph);
    Ok(())
}

fn emit(path: &Path, output: Option<&Path>, chars: bool) -> Result<()> {
    let file = PatternFile::load(path)?;
    let matcher = file.compile(chars)?;
    let json = serde_json::to_string_pretty(matcher.table())?;

    match output {
        Some(out) => {
            std::fs::write(out, json)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!(
                output = %out.display(),
                states = matcher.table().state_count(),
                "Byte table written"
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
