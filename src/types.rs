// types.rs
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::aws::ExportShell;
use crate::timer::TimerOptions;
use crate::utils::logging::LEVELS;

#[derive(Parser, Debug)]
#[command(
    name = "vaultpal",
    version,
    about = "Turns Vault secrets into AWS sessions, kubeconfigs and prompt timers",
    long_about = None
)]
pub struct Cli {
    /// Config file, defaults to ~/.vaultpal.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(short, long, global = true, default_value = "info", value_parser = LEVELS)]
    pub verbosity: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the remaining lifetime of the current token, for the shell prompt
    Timer(TimerArgs),

    /// Write resources to local files
    Write {
        #[command(subcommand)]
        target: WriteTarget,
    },

    /// Export resources to the shell
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },

    /// Switch between token roles
    Switch {
        #[command(subcommand)]
        target: SwitchTarget,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug, Default)]
pub struct TimerArgs {
    /// Print only the tier: green, yellow or red
    #[arg(short, long)]
    pub query: bool,

    /// Remove the cached TTLs and exit
    #[arg(short = 'x', long)]
    pub clear_cache: bool,

    /// Print a PS1 line that hooks the timer into bash
    #[arg(short, long)]
    pub bash: bool,
}

impl From<TimerArgs> for TimerOptions {
    fn from(args: TimerArgs) -> Self {
        TimerOptions {
            query: args.query,
            clear_cache: args.clear_cache,
            bash: args.bash,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum WriteTarget {
    /// Issue a client certificate and merge it into the vaultpal kubeconfig
    Kubeconfig { cluster: String, role: String },

    /// Write AWS STS credentials into ~/.aws/credentials
    Awscreds { role: String, profile: String },
}

#[derive(Subcommand, Debug)]
pub enum ExportTarget {
    /// Print AWS STS credentials as shell exports
    Awssts {
        role: Option<String>,

        /// Print a bash function that evals the exports instead
        #[arg(short, long)]
        alias: bool,

        /// AWS secrets engine path
        #[arg(short, long)]
        path: Option<String>,

        /// Syntax of the export statements
        #[arg(long, value_enum)]
        shell: Option<ExportShell>,
    },

    /// Print (and open) an AWS web console sign-in URL
    Awsconsole {
        role: String,

        /// Do not open the browser
        #[arg(short, long)]
        suppress_open: bool,

        /// AWS secrets engine path
        #[arg(short, long)]
        path: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SwitchTarget {
    /// Replace the stored token with a token for another role
    Role { role: String },
}
