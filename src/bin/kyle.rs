// Kyle model runner - CLI entry point

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use kyle_model::{Config, ConfigError, KyleError};

#[path = "../cli/model_commands.rs"]
mod model_commands;

#[derive(Parser)]
#[command(name = "kyle")]
#[command(version = "0.2.0")]
#[command(about = "Discretized Kyle (1985) insider trading model", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "kyle.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run pre-flight checks on the configured parameters
    Check,

    /// Solve the multiperiod model and simulate order flow
    Solve {
        /// Seed for the random source
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of discretization steps (N)
        #[arg(short = 'n', long)]
        steps: Option<usize>,

        /// Outer iteration budget
        #[arg(short, long)]
        max_iter: Option<usize>,

        /// Print the run as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Abort when a depth root is complex or non-positive
        #[arg(long)]
        strict_roots: bool,

        /// Fail when the initial variance target is not reached
        #[arg(long)]
        require_convergence: bool,
    },

    /// Closed-form single-period price and the N=1 cross-check
    OnePeriod {
        /// Seed for the random source
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Read config before logging so its level applies; report problems after
    let loaded = if std::path::Path::new(&cli.config).exists() {
        Some(Config::from_file(&cli.config))
    } else {
        None
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        match &loaded {
            Some(Ok(config)) => config.logging.level.parse().unwrap_or(Level::INFO),
            _ => Level::INFO,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 Kyle Model v0.2.0");
    info!("📁 Config: {}", cli.config);

    let result = match cli.command {
        // Init doesn't require config (it creates it)
        Commands::Init { force } => init_config(&cli.config, force),
        Commands::Check => {
            let config = resolve_config(loaded, &cli.config)?;
            model_commands::check(&config).await
        }
        Commands::Solve { seed, steps, max_iter, json, strict_roots, require_convergence } => {
            let config = resolve_config(loaded, &cli.config)?;
            let options = model_commands::SolveOptions {
                seed,
                steps,
                max_iterations: max_iter,
                json,
                strict_roots,
                require_convergence,
            };
            model_commands::solve(options, &config).await
        }
        Commands::OnePeriod { seed } => {
            let config = resolve_config(loaded, &cli.config)?;
            model_commands::one_period(seed, &config).await
        }
    };

    if let Err(e) = result {
        error!("❌ {} error", e.category());
        for line in e.user_message().lines() {
            error!("{}", line);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Use the loaded config, or defaults when no file exists
fn resolve_config(
    loaded: Option<Result<Config, ConfigError>>,
    path: &str,
) -> Result<Config, Box<dyn std::error::Error>> {
    match loaded {
        Some(Ok(config)) => Ok(config),
        Some(Err(e)) => {
            error!("❌ Configuration Error");
            error!("{}", e);
            error!("💡 Fix {} or run: kyle init --force", path);
            std::process::exit(1);
        }
        None => {
            warn!("⚠️  {} not found, using built-in defaults (run: kyle init)", path);
            Ok(Config::default())
        }
    }
}

fn init_config(path: &str, force: bool) -> Result<(), KyleError> {
    if std::path::Path::new(path).exists() && !force {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", path);
        return Ok(());
    }

    Config::default().to_file(path)?;
    info!("📝 Created {}", path);
    info!("💡 Next steps:");
    info!("   1. Edit {} to set the model parameters", path);
    info!("   2. Run: kyle check");
    info!("   3. Run: kyle solve --seed 42");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subcommand_parses() {
        let init = Cli::try_parse_from(["kyle", "init", "--force"]).unwrap();
        assert!(matches!(init.command, Commands::Init { force: true }));
        assert_eq!(init.config, "kyle.toml");

        let check = Cli::try_parse_from(["kyle", "-c", "other.toml", "check"]).unwrap();
        assert!(matches!(check.command, Commands::Check));
        assert_eq!(check.config, "other.toml");

        let solve = Cli::try_parse_from([
            "kyle", "solve", "--seed", "7", "-n", "10", "--max-iter", "60", "--json",
            "--strict-roots", "--require-convergence",
        ])
        .unwrap();
        match solve.command {
            Commands::Solve { seed, steps, max_iter, json, strict_roots, require_convergence } => {
                assert_eq!(seed, Some(7));
                assert_eq!(steps, Some(10));
                assert_eq!(max_iter, Some(60));
                assert!(json && strict_roots && require_convergence);
            }
            _ => panic!("expected solve"),
        }

        let one = Cli::try_parse_from(["kyle", "--verbose", "one-period", "-s", "3"]).unwrap();
        assert!(one.verbose);
        assert!(matches!(one.command, Commands::OnePeriod { seed: Some(3) }));
    }

    #[test]
    fn test_init_writes_config_without_loading_one() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kyle.toml");
        let path = path.to_str().unwrap();

        init_config(path, false).unwrap();
        assert_eq!(Config::from_file(path).unwrap(), Config::default());

        // Existing file is left alone without --force
        std::fs::write(path, "[model]\nsteps = 10\n").unwrap();
        init_config(path, false).unwrap();
        assert_eq!(Config::from_file(path).unwrap().model.steps, 10);

        init_config(path, true).unwrap();
        assert_eq!(Config::from_file(path).unwrap().model.steps, 50);
    }
}
