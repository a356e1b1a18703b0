use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pbxpatch::commands::{init_config_command, patch_command, status_command, ConfigOverrides};
use pbxpatch_core::patch::{FileOptions, PatchOptions};

/// Register bundled resource files in an Xcode project manifest.
///
/// This CLI is a thin wrapper around `pbxpatch-core`. All manifest parsing
/// and patching lives in the library so it can be tested and reused.
#[derive(Parser, Debug)]
#[command(
    name = "pbxpatch",
    version,
    about = "Register resource files in an Xcode project.pbxproj",
    long_about = None
)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Where the manifest lives and what to register in it.
#[derive(Args, Debug, Default)]
struct TargetArgs {
    /// Project root directory. Defaults to the current working directory.
    #[arg(long, default_value = ".")]
    root: String,

    /// Patch configuration file (YAML, or JSON with a `.json` extension).
    /// Defaults to `<root>/pbxpatch.yaml` when present.
    #[arg(long)]
    config: Option<String>,

    /// Manifest path relative to the root.
    #[arg(long)]
    manifest: Option<String>,

    /// Resource file name to register. Repeat to register several.
    #[arg(long = "resource")]
    resources: Vec<String>,

    /// Object identifier of the group that lists the resources.
    #[arg(long)]
    group_id: Option<String>,

    /// Group name, used when the identifier is absent or not found.
    #[arg(long = "group")]
    group_name: Option<String>,

    /// Object identifier of the resources build phase.
    #[arg(long)]
    phase_id: Option<String>,

    /// Native target whose resources phase should be used.
    #[arg(long)]
    target: Option<String>,
}

impl TargetArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            manifest: self.manifest.clone(),
            resources: self.resources.clone(),
            group_id: self.group_id.clone(),
            group_name: self.group_name.clone(),
            phase_id: self.phase_id.clone(),
            target: self.target.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add any missing file references, build files, group children and
    /// build phase entries for the configured resources.
    ///
    /// This is the default when no subcommand is given.
    Patch {
        #[command(flatten)]
        target: TargetArgs,

        /// Skip a missing group or build phase instead of failing.
        #[arg(long)]
        allow_partial: bool,

        /// Report what would change without writing the manifest.
        #[arg(long)]
        dry_run: bool,

        /// Copy the original manifest to `<manifest>.bak` before writing.
        #[arg(long)]
        backup: bool,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Report how each configured resource is registered.
    ///
    /// Exits non-zero when a resource is missing or registered more than once.
    Status {
        #[command(flatten)]
        target: TargetArgs,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Write the default patch configuration to `pbxpatch.yaml`.
    InitConfig {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Output path relative to the root.
        #[arg(long)]
        path: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if quiet {
        builder.filter_level(log::LevelFilter::Error);
    }
    builder.target(env_logger::Target::Stderr).format_timestamp(None).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let command = cli.command.unwrap_or(Command::Patch {
        target: TargetArgs { root: ".".to_string(), ..TargetArgs::default() },
        allow_partial: false,
        dry_run: false,
        backup: false,
        json: false,
    });

    match command {
        Command::Patch { target, allow_partial, dry_run, backup, json } => {
            let options = FileOptions { patch: PatchOptions { allow_partial }, dry_run, backup };
            patch_command(&target.root, target.config.as_deref(), &target.overrides(), options, json)?
        }
        Command::Status { target, json } => {
            status_command(&target.root, target.config.as_deref(), &target.overrides(), json)?
        }
        Command::InitConfig { root, path, force } => {
            init_config_command(&root, path.as_deref(), force)?
        }
    }

    Ok(())
}
