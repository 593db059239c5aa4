use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "dossier")]
#[command(about = "Retrieval-augmented audits of construction-project addenda", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Vault directory (overrides DOSSIER_VAULT_DIR)
    #[arg(long, global = true)]
    vault_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage organizations and projects
    Project(ProjectArgs),

    /// Show or replace a project's persistent notes
    Notes(NotesArgs),

    /// Manage a project's reference documents
    Docs(DocsArgs),

    /// Build the project's vector index and report its size
    Index(IndexArgs),

    /// List the generative models the gateway would try, in order
    Models,

    /// Audit an addendum against a project's reference file
    Audit(AuditArgs),
}

#[derive(Args)]
struct ProjectArgs {
    #[command(subcommand)]
    action: ProjectAction,
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create an organization/project pair
    Create { organization: String, project: String },

    /// List organizations, or the projects of one organization
    List { organization: Option<String> },
}

#[derive(Args)]
struct NotesArgs {
    organization: String,
    project: String,

    /// Replace the notes with this text; omit to print the current notes
    #[arg(long)]
    set: Option<String>,
}

#[derive(Args)]
struct DocsArgs {
    #[command(subcommand)]
    action: DocsAction,
}

#[derive(Subcommand)]
enum DocsAction {
    /// Copy a file into the project's reference documents
    Add {
        organization: String,
        project: String,
        file: PathBuf,
    },

    /// List the project's reference documents
    List { organization: String, project: String },

    /// Delete one reference document
    Remove {
        organization: String,
        project: String,
        filename: String,
    },
}

#[derive(Args)]
struct IndexArgs {
    organization: String,
    project: String,
}

#[derive(Args)]
struct AuditArgs {
    organization: String,
    project: String,

    /// File holding the addendum to audit
    addendum: PathBuf,

    /// Correction instructions; runs a revision after the initial audit
    #[arg(long)]
    corrections: Option<String>,

    /// Index and retrieve only, print the retrieval context, skip model calls
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let vault = match &cli.vault_dir {
        Some(dir) => dossier_store::Vault::new(dir),
        None => dossier_store::Vault::from_env(),
    };

    match cli.command {
        Commands::Project(args) => match args.action {
            ProjectAction::Create {
                organization,
                project,
            } => commands::project_create(&vault, &organization, &project),
            ProjectAction::List { organization } => {
                commands::project_list(&vault, organization.as_deref())
            }
        },
        Commands::Notes(args) => {
            commands::notes(&vault, &args.organization, &args.project, args.set.as_deref())
        }
        Commands::Docs(args) => match args.action {
            DocsAction::Add {
                organization,
                project,
                file,
            } => commands::docs_add(&vault, &organization, &project, &file),
            DocsAction::List {
                organization,
                project,
            } => commands::docs_list(&vault, &organization, &project),
            DocsAction::Remove {
                organization,
                project,
                filename,
            } => commands::docs_remove(&vault, &organization, &project, &filename),
        },
        Commands::Index(args) => {
            commands::index(&vault, &args.organization, &args.project).await
        }
        Commands::Models => commands::models().await,
        Commands::Audit(args) => {
            commands::audit(
                &vault,
                &args.organization,
                &args.project,
                &args.addendum,
                args.corrections.as_deref(),
                args.dry_run,
            )
            .await
        }
    }
}
