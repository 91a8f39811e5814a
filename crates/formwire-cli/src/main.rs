//! Formwire CLI
//!
//! Debugging surface for the submission protocol:
//! - Decode flat field names into structured paths
//! - Resolve a form-encoded payload (value tree, intent, fields, state)
//! - Flatten a resolved payload back into wire entries
//! - Run a rules file against a payload and print the submission result
//!
//! Payloads are `application/x-www-form-urlencoded` strings, passed as an
//! argument or piped on stdin with `-`.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;

use formwire_core::resolve::{resolve, Payload};
use formwire_core::state::FormState;
use formwire_core::submission::{parse, SubmissionStatus};
use formwire_core::value::{flatten, FormValue};
use formwire_rules::{RuleSchema, RuleValidator};

#[derive(Parser)]
#[command(name = "formwire")]
#[command(author, version, about = "Form submission protocol toolbox")]
struct Cli {
    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a flat field name into its structured path.
    Decode {
        /// Field name, e.g. `items[0].name`.
        name: String,
    },

    /// Resolve a payload: value tree, intent, fields, carried state.
    Resolve {
        /// URL-encoded payload, or `-` for stdin.
        payload: String,
    },

    /// Resolve a payload and print its flattened wire entries.
    Flatten {
        /// URL-encoded payload, or `-` for stdin.
        payload: String,
    },

    /// Validate a payload against a rules file and print the result.
    Check {
        /// Path to a JSON rules file (a serialized rule schema).
        #[arg(long)]
        rules: PathBuf,

        /// URL-encoded payload, or `-` for stdin.
        payload: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport<'a> {
    data: &'a FormValue,
    intent: Option<String>,
    fields: &'a [String],
    list_fields: &'a BTreeSet<String>,
    state: &'a FormState,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Decode { name } => {
            let path = formwire_path::decode(name)?;
            print_json(cli, &path)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resolve { payload } => {
            let payload = read_payload(payload)?;
            let form = resolve(&payload)?;
            let report = ResolveReport {
                data: &form.data,
                intent: form.intent.as_ref().map(|intent| intent.encode()),
                fields: &form.fields,
                list_fields: &form.list_fields,
                state: &form.state,
            };
            print_json(cli, &report)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Flatten { payload } => {
            let payload = read_payload(payload)?;
            let form = resolve(&payload)?;
            print_json(cli, &flatten(&form.data))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { rules, payload } => {
            let text = fs::read_to_string(rules)
                .with_context(|| format!("failed to read rules file `{}`", rules.display()))?;
            let schema: RuleSchema = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse rules file `{}`", rules.display()))?;
            let payload = read_payload(payload)?;
            let submission = parse(&payload, &RuleValidator::new(schema))?;

            let status = submission.status();
            let label = match status {
                SubmissionStatus::Accepted => "accepted".green().bold(),
                SubmissionStatus::Rejected => "rejected".red().bold(),
                SubmissionStatus::Pending => "pending".yellow().bold(),
            };
            eprintln!("{label}");
            print_json(cli, &submission.revise())?;

            Ok(match status {
                SubmissionStatus::Rejected => ExitCode::from(1),
                _ => ExitCode::SUCCESS,
            })
        }
    }
}

fn read_payload(arg: &str) -> Result<Payload> {
    let raw = if arg == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read payload from stdin")?;
        buffer.trim_end().to_string()
    } else {
        arg.to_string()
    };
    Ok(Payload::from_urlencoded(&raw))
}

fn print_json<T: Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
