//! wizctl: lifecycle protection, cloning and versioning for wizard definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wizctl::cmd::{self, OutputFormat, flow::RuleArgs};
use wizctl::config::Config;
use wizctl::diagnostic::{Diagnostic, DiagnosticLevel};
use wizctl::guard::Confirmation;
use wizctl::lock::acquire_data_lock;
use wizctl::model::{DependencyType, LifecycleState};
use wizctl::store::RunFilter;
use wizctl::ui;
use wizctl::write::WriteOp;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "WIZCTL_LOG";

#[derive(Parser)]
#[command(name = "wizctl")]
#[command(about = "Lifecycle protection, structural cloning and versioning for wizard definitions")]
#[command(version)]
struct Cli {
    /// Path to wizctl config (TOML)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Confirm operations that affect active runs or destroy data
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Output format for read commands
    #[arg(short = 'o', long, global = true, value_enum, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize wizctl in the current directory
    Init {
        /// Dry run: show what would be written
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate every wizard in the data root
    #[command(visible_alias = "lint")]
    Check {
        /// Treat warnings as errors
        #[arg(short = 'W', long)]
        deny_warnings: bool,
    },

    /// Show summary counts
    #[command(visible_alias = "stat")]
    Status,

    /// Manage wizards
    #[command(visible_alias = "wiz")]
    Wizard {
        #[command(subcommand)]
        command: WizardCommand,
    },

    /// Manage option dependencies
    Dep {
        #[command(subcommand)]
        command: DepCommand,
    },

    /// Manage step flow rules
    Flow {
        #[command(subcommand)]
        command: FlowCommand,
    },

    /// Record wizard runs
    Run {
        #[command(subcommand)]
        command: RunCommand,
    },
}

#[derive(Subcommand)]
enum WizardCommand {
    /// Create a wizard from a JSON definition ('-' reads stdin)
    New { definition: PathBuf },
    /// List wizards
    #[command(visible_alias = "ls")]
    List {
        /// Only wizards in this cached state
        #[arg(long, value_enum)]
        state: Option<LifecycleState>,
        /// Include archived wizards
        #[arg(short = 'a', long)]
        all: bool,
        /// Limit the number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show a wizard and its structure
    Show { id: String },
    /// Show lifecycle protection status
    Protection { id: String },
    /// Check whether a wizard may be modified
    CanModify { id: String },
    /// Check whether a wizard may be deleted
    CanDelete { id: String },
    /// Set a top-level field
    Set {
        id: String,
        field: String,
        /// New value (empty clears optional fields)
        value: String,
    },
    /// Replace the whole step tree from a JSON array ('-' reads stdin)
    ReplaceSteps { id: String, steps: PathBuf },
    /// Publish a wizard
    Publish {
        id: String,
        /// Unpublish instead
        #[arg(long)]
        undo: bool,
    },
    /// Soft-delete a wizard
    #[command(visible_alias = "rm")]
    Delete { id: String },
    /// Deep-copy a wizard into a new draft
    Clone {
        id: String,
        /// Name of the copy
        name: String,
        /// Creator recorded on the copy (default: project.default_creator)
        #[arg(long)]
        creator: Option<String>,
        /// Description of the copy (default: the source's)
        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    /// Create the next linked version of a wizard
    Version {
        id: String,
        /// Name of the version (default: "<name> v<number>")
        #[arg(long)]
        name: Option<String>,
    },
    /// List every version linked to a wizard
    Lineage { id: String },
    /// Archive a wizard
    Archive { id: String },
    /// Unarchive a wizard
    Unarchive { id: String },
    /// Recompute the cached lifecycle state from runs
    Refresh { id: String },
    /// Delete all runs of a wizard (requires --force)
    PurgeRuns { id: String },
}

#[derive(Subcommand)]
enum DepCommand {
    /// Make OPTION depend on DEPENDS_ON
    Add {
        option: String,
        depends_on: String,
        #[arg(short = 't', long = "type", value_enum, default_value = "show_if")]
        dependency_type: DependencyType,
    },
    /// List the dependencies of an option
    #[command(visible_alias = "ls")]
    List { option: String },
    /// Remove a dependency
    #[command(visible_alias = "rm")]
    Remove { id: String },
}

#[derive(clap::Args, Clone)]
struct RuleFlags {
    /// Condition JSON, e.g. '{"option_set_id": "...", "operator": "is_answered"}'
    #[arg(long)]
    condition: Option<String>,
    /// Higher priority rules are tried first
    #[arg(short = 'p', long)]
    priority: Option<i32>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl RuleFlags {
    fn into_args(self, inactive: bool) -> RuleArgs {
        RuleArgs {
            condition: self.condition,
            priority: self.priority,
            name: self.name,
            description: self.description,
            inactive,
        }
    }
}

#[derive(Subcommand)]
enum FlowCommand {
    /// Route FROM to TO within a wizard
    Add {
        wizard: String,
        from: String,
        to: String,
        #[command(flatten)]
        flags: RuleFlags,
        /// Store the rule disabled
        #[arg(long)]
        inactive: bool,
    },
    /// Change an existing rule
    Update {
        rule: String,
        #[command(flatten)]
        flags: RuleFlags,
        /// Enable or disable the rule
        #[arg(long)]
        active: Option<bool>,
    },
    /// List the rules of a wizard, highest priority first
    #[command(visible_alias = "ls")]
    List { wizard: String },
    /// Remove a rule
    #[command(visible_alias = "rm")]
    Remove { rule: String },
}

#[derive(Subcommand)]
enum RunCommand {
    /// Start a run
    Start {
        wizard: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Complete a run
    Complete {
        run: String,
        /// Store the run's data (makes the wizard published)
        #[arg(long)]
        store: bool,
    },
    /// Abandon a run
    Abandon { run: String },
    /// List the runs of a wizard
    #[command(visible_alias = "ls")]
    List {
        wizard: String,
        #[arg(long, value_enum, default_value = "all")]
        filter: RunFilter,
    },
}

impl Commands {
    /// Commands that write to the data root and must hold its lock
    fn is_write(&self) -> bool {
        match self {
            Self::Init { .. } | Self::Check { .. } | Self::Status => false,
            Self::Wizard { command } => !matches!(
                command,
                WizardCommand::List { .. }
                    | WizardCommand::Show { .. }
                    | WizardCommand::Protection { .. }
                    | WizardCommand::CanModify { .. }
                    | WizardCommand::CanDelete { .. }
                    | WizardCommand::Lineage { .. }
            ),
            Self::Dep { command } => !matches!(command, DepCommand::List { .. }),
            Self::Flow { command } => !matches!(command, FlowCommand::List { .. }),
            Self::Run { command } => !matches!(command, RunCommand::List { .. }),
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    // A subscriber may already be installed when embedded
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = run(&cli);

    match result {
        Ok(diags) => {
            let has_errors = diags.iter().any(|d| d.level == DiagnosticLevel::Error);
            let has_warnings = diags.iter().any(|d| d.level == DiagnosticLevel::Warning);

            for diag in &diags {
                ui::diagnostic(diag);
            }

            if has_errors {
                ExitCode::FAILURE
            } else if has_warnings {
                if matches!(
                    cli.command,
                    Commands::Check {
                        deny_warnings: true
                    }
                ) {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Vec<Diagnostic>> {
    let command = &cli.command;
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config);

    let _lock = if command.is_write() {
        Some(acquire_data_lock(&config)?)
    } else {
        None
    };
    let confirm = Confirmation::from_flag(cli.force);
    let output = cli.output;

    match command {
        Commands::Init { dry_run } => {
            cmd::new::init_project(&config, cli.force, WriteOp::from_dry_run(*dry_run))
        }
        Commands::Check { deny_warnings: _ } => cmd::check::check_all(&config),
        Commands::Status => cmd::status::show_status(&config),
        Commands::Wizard { command } => match command {
            WizardCommand::New { definition } => cmd::wizard::new(&config, definition),
            WizardCommand::List { state, all, limit } => {
                cmd::list::list_wizards(&config, *state, *all, *limit, output)
            }
            WizardCommand::Show { id } => cmd::wizard::show(&config, id, output),
            WizardCommand::Protection { id } => cmd::wizard::protection(&config, id, output),
            WizardCommand::CanModify { id } => cmd::wizard::can_modify(&config, id, output),
            WizardCommand::CanDelete { id } => cmd::wizard::can_delete(&config, id, output),
            WizardCommand::Set { id, field, value } => {
                cmd::wizard::set_field(&config, id, field, value, confirm)
            }
            WizardCommand::ReplaceSteps { id, steps } => {
                cmd::wizard::replace_steps(&config, id, steps, confirm)
            }
            WizardCommand::Publish { id, undo } => {
                cmd::wizard::publish(&config, id, !*undo, confirm)
            }
            WizardCommand::Delete { id } => cmd::wizard::delete(&config, id, confirm),
            WizardCommand::Clone {
                id,
                name,
                creator,
                description,
            } => cmd::wizard::clone(
                &config,
                id,
                name,
                creator.as_deref(),
                description.as_deref(),
            ),
            WizardCommand::Version { id, name } => {
                cmd::wizard::version(&config, id, name.as_deref())
            }
            WizardCommand::Lineage { id } => cmd::wizard::lineage(&config, id, output),
            WizardCommand::Archive { id } => cmd::wizard::archive(&config, id, true),
            WizardCommand::Unarchive { id } => cmd::wizard::archive(&config, id, false),
            WizardCommand::Refresh { id } => cmd::wizard::refresh(&config, id),
            WizardCommand::PurgeRuns { id } => cmd::wizard::purge_runs(&config, id, confirm),
        },
        Commands::Dep { command } => match command {
            DepCommand::Add {
                option,
                depends_on,
                dependency_type,
            } => cmd::dep::add(&config, option, depends_on, *dependency_type, confirm),
            DepCommand::List { option } => cmd::dep::list(&config, option, output),
            DepCommand::Remove { id } => cmd::dep::remove(&config, id, confirm),
        },
        Commands::Flow { command } => match command {
            FlowCommand::Add {
                wizard,
                from,
                to,
                flags,
                inactive,
            } => cmd::flow::add(
                &config,
                wizard,
                from,
                to,
                flags.clone().into_args(*inactive),
                confirm,
            ),
            FlowCommand::Update {
                rule,
                flags,
                active,
            } => cmd::flow::update(
                &config,
                rule,
                flags.clone().into_args(false),
                *active,
                confirm,
            ),
            FlowCommand::List { wizard } => cmd::flow::list(&config, wizard, output),
            FlowCommand::Remove { rule } => cmd::flow::remove(&config, rule, confirm),
        },
        Commands::Run { command } => match command {
            RunCommand::Start { wizard, name } => {
                cmd::run::start(&config, wizard, name.as_deref())
            }
            RunCommand::Complete { run, store } => cmd::run::complete(&config, run, *store),
            RunCommand::Abandon { run } => cmd::run::abandon(&config, run),
            RunCommand::List { wizard, filter } => {
                cmd::run::list(&config, wizard, *filter, output)
            }
        },
    }
}
