//! mosman - a session-managing companion CLI for the Mongoose OS mos tool
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mosman::commands;

/// mosman - a session-managing companion for the Mongoose OS mos tool
#[derive(Parser, Debug)]
#[command(name = "mosman")]
#[command(about = "Build, flash, and manage a Mongoose OS device", long_about = None)]
struct Args {
    /// Path to the firmware project directory (defaults to the current dir)
    #[arg(long, value_name = "PATH", global = true)]
    project_dir: Option<PathBuf>,

    /// Override the selected port for this run
    #[arg(long, global = true)]
    port: Option<String>,

    /// Override the selected board for this run
    #[arg(long, global = true)]
    board: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enumerate available device ports
    Ports,
    /// Stream device console output until interrupted
    Console,
    /// List files on the device
    Ls,
    /// Fetch a remote file into the local mirror
    Get { name: String },
    /// Upload a local file to the device
    Put {
        local: PathBuf,
        remote: Option<String>,
    },
    /// Device configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Build firmware
    Build {
        /// Build locally instead of in the cloud
        #[arg(long)]
        local: bool,
        /// Verbose build output
        #[arg(long)]
        verbose: bool,
    },
    /// Flash firmware to the device
    Flash,
    /// Reboot the device
    Reboot,
    /// Show device system info
    Info,
    /// List RPC methods exposed by the device
    RpcList,
    /// List known boards
    Boards,
    /// Persist the selected port
    UsePort { port: String },
    /// Persist the selected board
    UseBoard { board: String },
    /// Run a raw tool command line
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },
    /// Attach: idle console stream plus mirror-directory watching
    Attach,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Fetch the device configuration into the local mirror
    Get,
    /// Diff the edited config mirror against the device and save changes
    Sync,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    mosman_core::logging::init()?;

    let project_dir = args
        .project_dir
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Command::Boards = args.command {
        // No tool or settings needed to print the table.
        commands::boards();
        return Ok(());
    }

    let ctx = commands::Context::load(project_dir, args.port, args.board)?;

    match args.command {
        Command::Ports => commands::list_ports(&ctx).await?,
        Command::Console => commands::console(&ctx).await?,
        Command::Ls => commands::list_files(&ctx).await?,
        Command::Get { name } => commands::get_file(&ctx, &name).await?,
        Command::Put { local, remote } => commands::put_file(&ctx, &local, remote).await?,
        Command::Config { action } => match action {
            ConfigAction::Get => commands::config_get(&ctx).await?,
            ConfigAction::Sync => commands::config_sync_cmd(&ctx).await?,
        },
        Command::Build { local, verbose } => commands::build(&ctx, local, verbose).await?,
        Command::Flash => commands::flash(&ctx).await?,
        Command::Reboot => commands::reboot(&ctx).await?,
        Command::Info => commands::info(&ctx).await?,
        Command::RpcList => commands::rpc_list(&ctx).await?,
        Command::UsePort { port } => commands::use_port(&ctx, &port)?,
        Command::UseBoard { board } => commands::use_board(&ctx, &board)?,
        Command::Run { args } => commands::run_raw(&ctx, &args).await?,
        Command::Attach => commands::attach(&ctx).await?,
        Command::Boards => unreachable!("handled above"),
    }

    Ok(())
}
