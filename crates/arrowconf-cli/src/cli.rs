//! arrowconf CLI - resolve directives in configuration files
//!
//! Usage:
//!   arrowconf resolve config.yaml --format json --timeout 10s
//!   arrowconf get config.yaml database.port
//!   arrowconf check config.yaml secrets.json

use arrowconf_core::{loader, CancelToken, Error, Interpolator, Value};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Exit code for directive resolution failures
const EXIT_RESOLVE: u8 = 1;
/// Exit code for unreadable input and setup failures
const EXIT_LOAD: u8 = 2;

/// arrowconf - resolve ENV->, FS->, VAULT-> directives in config files
#[derive(Parser)]
#[command(name = "arrowconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ResolveArgs {
    /// Give up after this long (e.g. 30s, 2m)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Don't attach Vault even if VAULT_CONFIG is set
    #[arg(long)]
    no_vault: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fully resolved configuration
    Resolve {
        /// Configuration file
        file: PathBuf,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        args: ResolveArgs,
    },

    /// Print one resolved value
    Get {
        /// Configuration file
        file: PathBuf,

        /// Path to the value (e.g., database.port)
        path: String,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Default value if key not found
        #[arg(short, long)]
        default: Option<String>,

        #[command(flatten)]
        args: ResolveArgs,
    },

    /// Check that files decode, without resolving directives
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            file,
            format,
            output,
            args,
        } => cmd_resolve(&file, &format, output, &args),

        Commands::Get {
            file,
            path,
            format,
            default,
            args,
        } => cmd_get(&file, &path, &format, default, &args),

        Commands::Check { files } => cmd_check(files),
    }
}

fn cancel_token(args: &ResolveArgs) -> CancelToken {
    match args.timeout {
        Some(timeout) => CancelToken::with_timeout(timeout),
        None => CancelToken::new(),
    }
}

#[cfg(feature = "vault")]
fn interpolator(args: &ResolveArgs, cancel: &CancelToken) -> Result<Interpolator, Error> {
    use std::sync::Arc;

    let interpolator = Interpolator::with_builtins()?;
    if args.no_vault || std::env::var_os(arrowconf_vault::CREDS_ENV).is_none() {
        return Ok(interpolator);
    }

    let vault = arrowconf_vault::VaultClient::from_env(cancel)?;
    log::debug!("vault attached at {}", vault.host());
    Ok(interpolator.with_secret_store(Arc::new(vault)))
}

#[cfg(not(feature = "vault"))]
fn interpolator(_args: &ResolveArgs, _cancel: &CancelToken) -> Result<Interpolator, Error> {
    Interpolator::with_builtins()
}

/// Read and resolve `file`, reporting failures with the matching exit code
fn resolve_file(file: &Path, args: &ResolveArgs) -> Result<Value, ExitCode> {
    let raw = loader::read_value(file).map_err(|e| {
        eprintln!("{}: {}", "Error".red(), e);
        ExitCode::from(EXIT_LOAD)
    })?;

    let cancel = cancel_token(args);
    let interpolator = interpolator(args, &cancel).map_err(|e| {
        eprintln!("{}: {}", "Error".red(), e);
        ExitCode::from(EXIT_LOAD)
    })?;

    interpolator.interpolate_with(raw, &cancel).map_err(|e| {
        eprintln!("{} Resolution failed\n", "✗".red());
        eprintln!("{}", e);
        ExitCode::from(EXIT_RESOLVE)
    })
}

/// Replace durations with human-readable literals so the tree prints cleanly
fn for_output(value: Value) -> Value {
    match value {
        Value::Duration(d) => Value::String(humantime::format_duration(d).to_string()),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(for_output).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, for_output(v)))
                .collect(),
        ),
        other => other,
    }
}

fn render(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        "text" => Ok(match value {
            Value::Mapping(_) | Value::Sequence(_) => {
                serde_yaml::to_string(value).map_err(|e| e.to_string())?
            }
            scalar => format!("{}\n", scalar),
        }),
        other => Err(format!(
            "Unsupported format: {}. Use text, yaml, or json.",
            other
        )),
    }
}

fn cmd_resolve(file: &Path, format: &str, output: Option<PathBuf>, args: &ResolveArgs) -> ExitCode {
    if format == "text" {
        eprintln!("{}: resolve supports yaml or json", "Error".red());
        return ExitCode::from(EXIT_LOAD);
    }

    let value = match resolve_file(file, args) {
        Ok(v) => for_output(v),
        Err(code) => return code,
    };

    let content = match render(&value, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(EXIT_LOAD);
        }
    };

    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, &content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(EXIT_LOAD);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }
    ExitCode::SUCCESS
}

fn cmd_get(
    file: &Path,
    path: &str,
    format: &str,
    default: Option<String>,
    args: &ResolveArgs,
) -> ExitCode {
    let value = match resolve_file(file, args) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let found = match value.get_path(path) {
        Ok(v) => for_output(v.clone()),
        Err(_) => {
            return match default {
                Some(default_val) => {
                    println!("{}", default_val);
                    ExitCode::SUCCESS
                }
                None => {
                    eprintln!("{}: Path '{}' not found", "Error".red(), path);
                    ExitCode::from(EXIT_RESOLVE)
                }
            };
        }
    };

    match render(&found, format) {
        Ok(content) => {
            print!("{}", content);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(EXIT_LOAD)
        }
    }
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        match loader::read_value(&file) {
            Ok(value) => {
                println!(
                    "{} {}: valid ({})",
                    "✓".green(),
                    file.display(),
                    value.type_name()
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_LOAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_timeout_flag_parses_durations() {
        let cli = Cli::try_parse_from(["arrowconf", "get", "app.yaml", "db.port", "--timeout", "1m30s"])
            .unwrap();
        match cli.command {
            Commands::Get { args, path, .. } => {
                assert_eq!(path, "db.port");
                assert_eq!(args.timeout, Some(Duration::from_secs(90)));
                assert!(!args.no_vault);
            }
            _ => panic!("expected get"),
        }

        assert!(Cli::try_parse_from(["arrowconf", "resolve", "app.yaml", "--timeout", "soon"]).is_err());
    }

    #[test]
    fn test_durations_render_as_literals() {
        let tree: Value = serde_yaml::from_str("timeout: 1m30s::duration\nport: 80\n").unwrap();
        let resolved = Interpolator::with_builtins()
            .unwrap()
            .interpolate(tree)
            .unwrap();
        assert_eq!(
            resolved.get_path("timeout").unwrap().as_duration(),
            Some(Duration::from_secs(90))
        );

        let yaml = render(&for_output(resolved), "yaml").unwrap();
        assert_eq!(yaml, "timeout: 1m 30s\nport: 80\n");
    }

    #[test]
    fn test_render_scalar_text() {
        assert_eq!(render(&Value::Integer(5), "text").unwrap(), "5\n");
        assert_eq!(render(&Value::String("x".into()), "text").unwrap(), "x\n");
        assert!(render(&Value::Null, "toml").is_err());
    }

    #[test]
    fn test_resolve_file_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let args = ResolveArgs {
            timeout: None,
            no_vault: true,
        };

        let missing = resolve_file(&dir.path().join("missing.yaml"), &args).unwrap_err();
        assert_eq!(missing, ExitCode::from(EXIT_LOAD));

        std::env::remove_var("ARROWCONF_CLI_UNSET");
        let path = dir.path().join("app.yaml");
        std::fs::write(&path, "a: ENV->ARROWCONF_CLI_UNSET\nb: 2::atoi\n").unwrap();
        let failed = resolve_file(&path, &args).unwrap_err();
        assert_eq!(failed, ExitCode::from(EXIT_RESOLVE));

        std::fs::write(&path, "b: 2::atoi\n").unwrap();
        let value = resolve_file(&path, &args).unwrap();
        assert_eq!(value.get_path("b").unwrap().as_i64(), Some(2));
    }
}
