mod skill_commands;
mod sources;

use {
    clap::{Parser, Subcommand},
    skilldeck_config::{LoggingConfig, discover_and_load},
    skilldeck_skills::{SkillRegistry, ToggleMode},
    tracing::{debug, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::{skill_commands::Context, sources::SourceArgs};

/// Filter used when neither `RUST_LOG`, `--log-level` nor the config sets one.
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser)]
#[command(
    name = "skilldeck",
    version,
    about = "Find, filter and toggle agent skills"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    sources: SourceArgs,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List skills that pass the selectors.
    List {
        /// Also report scanned directories, warnings and conflicts.
        #[arg(long)]
        diagnostics: bool,
    },
    /// Show one skill and its instructions.
    Info {
        /// Name, short name, or `provider:name` id.
        name: String,
    },
    /// Fuzzy-search names and descriptions.
    Search {
        query: String,
        /// Search manifest text instead.
        #[arg(long)]
        content: bool,
        /// Show at most this many results.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check a manifest's frontmatter.
    Validate {
        /// Skill name, bundle directory or manifest path.
        target: String,
    },
    /// Rename `.SKILL.md` back to `SKILL.md`.
    Enable {
        /// Skills to enable; all visible disabled skills when omitted.
        names: Vec<String>,
        /// Replace an existing `SKILL.md`.
        #[arg(long)]
        force: bool,
    },
    /// Rename `SKILL.md` to `.SKILL.md`.
    Disable {
        /// Skills to disable; all visible enabled skills when omitted.
        names: Vec<String>,
        /// Replace an existing `.SKILL.md`.
        #[arg(long)]
        force: bool,
    },
}

fn init_telemetry(cli: &Cli, logging: &LoggingConfig) {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output, so logs go to stderr.
    if cli.json_logs || logging.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let loaded = discover_and_load();
    init_telemetry(&cli, &loaded.config.logging);

    match (&loaded.path, &loaded.error) {
        (Some(path), Some(e)) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        },
        (Some(path), None) => debug!(path = %path.display(), "loaded config"),
        (None, _) => debug!("no config file found, using defaults"),
    }

    let skills_config = &loaded.config.skills;
    let toggling = matches!(cli.command, Commands::Enable { .. } | Commands::Disable { .. });
    let options =
        cli.sources
            .discovery_options(skills_config, std::env::current_dir()?, toggling);
    let ctx = Context {
        filters: cli.sources.filters(skills_config)?,
        state: cli.sources.state(),
        registry: SkillRegistry::new(options),
        json: cli.json,
    };

    match cli.command {
        Commands::List { diagnostics } => skill_commands::list(&ctx, diagnostics),
        Commands::Info { name } => skill_commands::info(&ctx, &name),
        Commands::Search {
            query,
            content,
            limit,
        } => skill_commands::search(&ctx, &query, content, limit),
        Commands::Validate { target } => skill_commands::validate(&ctx, &target),
        Commands::Enable { names, force } => {
            skill_commands::toggle(&ctx, ToggleMode::Enable, &names, force)
        },
        Commands::Disable { names, force } => {
            skill_commands::toggle(&ctx, ToggleMode::Disable, &names, force)
        },
    }
}

/// Print an error plus whatever remediation the skills library attached.
fn report(err: &anyhow::Error) {
    eprintln!("error: {err:#}");
    let Some(e) = err.downcast_ref::<skilldeck_skills::Error>() else {
        return;
    };
    let suggestions = e.suggestions();
    match e {
        skilldeck_skills::Error::NotFound { .. } | skilldeck_skills::Error::Ambiguous { .. }
            if !suggestions.is_empty() =>
        {
            eprintln!("Did you mean: {}", suggestions.join(", "));
        },
        _ => {
            for hint in suggestions {
                eprintln!("  {hint}");
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        report(&e);
        std::process::exit(1);
    }
}
