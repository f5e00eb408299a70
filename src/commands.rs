//! CLI command implementations
//!
//! Every command goes through the one [`SessionManager`], so a long-running
//! invocation (typically the attached console stream) is preempted before
//! the new command starts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mosman_core::prelude::*;
use mosman_core::{board_flags, board_names, load_settings, save_settings, Settings};
use mosman_session::{
    config_sync, files, ports, tool_check, DeviceFileCache, IdleConsoleScheduler, Markers, Mirror,
    OutputSink, SaveAction, SessionManager, StdoutSink, SyncOutcome,
};

use crate::watcher::MirrorWatcher;

/// Everything a command needs: settings, the session, and the mirror
#[derive(Debug)]
pub struct Context {
    pub project_dir: PathBuf,
    pub settings: Settings,
    pub session: Arc<SessionManager>,
    pub mirror: Mirror,
}

impl Context {
    /// Load settings for `project_dir`, apply one-shot overrides, and build
    /// the session
    pub fn load(
        project_dir: PathBuf,
        port_override: Option<String>,
        board_override: Option<String>,
    ) -> Result<Self> {
        let mut settings = load_settings(&project_dir);
        if let Some(port) = port_override {
            settings.port = port;
        }
        if let Some(board) = board_override {
            settings.board = board;
        }

        tool_check::ensure_tool(&settings.tool)?;

        let session = Arc::new(SessionManager::from_settings(&settings, &project_dir));
        let mirror = Mirror::new(settings.storage_dir(&project_dir));

        Ok(Self {
            project_dir,
            settings,
            session,
            mirror,
        })
    }

    fn display_sink(&self) -> Arc<dyn OutputSink> {
        Arc::new(StdoutSink)
    }
}

/// `mosman ports`
pub async fn list_ports(ctx: &Context) -> Result<()> {
    match ports::list_ports(&ctx.session).await {
        Ok(found) => {
            for port in found {
                println!("{port}");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", ports::tool_health_hint(&ctx.settings.tool));
            Err(err)
        }
    }
}

/// `mosman console`: stream until interrupted or preempted
pub async fn console(ctx: &Context) -> Result<()> {
    ctx.session
        .invoke(&["console"], ctx.display_sink(), Markers::Emit)
        .await
}

/// `mosman ls`
pub async fn list_files(ctx: &Context) -> Result<()> {
    let mut cache = DeviceFileCache::new();
    cache.refresh(&ctx.session).await?;
    for name in cache.files() {
        println!("{name}");
    }
    Ok(())
}

/// `mosman get <name>`: fetch into the mirror
pub async fn get_file(ctx: &Context, name: &str) -> Result<()> {
    let local = ctx.mirror.fetch_file(&ctx.session, name).await?;
    println!("Fetched {} to {}", name, local.display());
    Ok(())
}

/// `mosman put <local> [remote]`
pub async fn put_file(ctx: &Context, local: &Path, remote: Option<String>) -> Result<()> {
    let remote = match remote {
        Some(name) => name,
        None => local
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::config(format!("No file name in {}", local.display())))?,
    };
    files::put_file(&ctx.session, local, &remote, ctx.display_sink()).await?;
    println!("File saved");
    Ok(())
}

/// `mosman config get`: fetch the device configuration into the mirror
pub async fn config_get(ctx: &Context) -> Result<()> {
    let local = ctx.mirror.fetch_config(&ctx.session).await?;
    println!("Device configuration written to {}", local.display());
    println!("Edit it and run 'mosman config sync' to save changes.");
    Ok(())
}

/// `mosman config sync`: diff the edited mirror against the device and save
pub async fn config_sync_cmd(ctx: &Context) -> Result<()> {
    let mirror_path = ctx.mirror.config_path();
    let local = std::fs::read_to_string(&mirror_path).map_err(|_| {
        Error::config(format!(
            "No config mirror at {}; run 'mosman config get' first",
            mirror_path.display()
        ))
    })?;

    let remote = config_sync::fetch_config(&ctx.session).await?;
    let changed = config_sync::diff(&remote, &local);
    match config_sync::sync(&ctx.session, &changed, ctx.display_sink()).await? {
        SyncOutcome::Saved => println!("Config saved"),
        SyncOutcome::Unchanged => println!("Config not changed. Save aborted."),
    }
    Ok(())
}

/// `mosman build [--local] [--verbose]`
pub async fn build(ctx: &Context, local: bool, verbose: bool) -> Result<()> {
    let mut args = vec!["build".to_string()];
    if local {
        args.push("--local".to_string());
    }
    if verbose {
        args.push("--verbose".to_string());
    }
    ctx.session
        .invoke(&args, ctx.display_sink(), Markers::Emit)
        .await
}

/// `mosman flash`
pub async fn flash(ctx: &Context) -> Result<()> {
    ctx.session
        .invoke(&["flash"], ctx.display_sink(), Markers::Emit)
        .await
}

/// `mosman reboot`
pub async fn reboot(ctx: &Context) -> Result<()> {
    ctx.session
        .invoke(&["call", "Sys.Reboot"], ctx.display_sink(), Markers::Emit)
        .await?;
    println!("Device rebooted");
    Ok(())
}

/// `mosman info`
pub async fn info(ctx: &Context) -> Result<()> {
    ctx.session
        .invoke(&["call", "Sys.GetInfo"], ctx.display_sink(), Markers::Emit)
        .await
}

/// `mosman rpc-list`
pub async fn rpc_list(ctx: &Context) -> Result<()> {
    ctx.session
        .invoke(&["call", "RPC.List"], ctx.display_sink(), Markers::Emit)
        .await
}

/// `mosman boards`
pub fn boards() {
    for name in board_names() {
        println!("{name}");
    }
}

/// `mosman use-port <port>`: persist the selection
pub fn use_port(ctx: &Context, port: &str) -> Result<()> {
    let mut settings = ctx.settings.clone();
    settings.port = port.to_string();
    save_settings(&ctx.project_dir, &settings)?;
    println!("Port set to {port}");
    Ok(())
}

/// `mosman use-board <board>`: validate against the table and persist
pub fn use_board(ctx: &Context, board: &str) -> Result<()> {
    if board_flags(board).is_none() {
        return Err(Error::config(format!(
            "Unknown board \"{board}\"; run 'mosman boards' for the list"
        )));
    }
    let mut settings = ctx.settings.clone();
    settings.board = board.to_string();
    save_settings(&ctx.project_dir, &settings)?;
    println!("Board set to {board}");
    Ok(())
}

/// Normalize a raw command line: strip an optional leading tool name
/// (case-insensitive) and surrounding whitespace
pub fn normalize_raw_command(tool: &str, input: &str) -> Vec<String> {
    let mut parts = input.split_whitespace().peekable();
    if parts
        .peek()
        .is_some_and(|first| first.eq_ignore_ascii_case(tool))
    {
        parts.next();
    }
    parts.map(str::to_string).collect()
}

/// `mosman run <raw...>`
pub async fn run_raw(ctx: &Context, raw: &[String]) -> Result<()> {
    let args = normalize_raw_command(&ctx.settings.tool, &raw.join(" "));
    if args.is_empty() {
        return Ok(());
    }
    ctx.session
        .invoke(&args, ctx.display_sink(), Markers::Emit)
        .await
}

/// `mosman attach`: idle console stream plus mirror-directory watching
///
/// Runs until Ctrl-C. The idle scheduler keeps a console stream alive while
/// nothing else runs; saving a file under the mirror uploads it, and saving
/// the config mirror diffs-and-syncs it against the device.
pub async fn attach(ctx: &Context) -> Result<()> {
    // Startup probe doubling as a tool-version check.
    if ports::list_ports(&ctx.session).await.is_err() {
        eprintln!("{}", ports::tool_health_hint(&ctx.settings.tool));
    }

    ctx.mirror.ensure()?;
    let sink = ctx.display_sink();

    let mut scheduler = IdleConsoleScheduler::new(ctx.session.clone(), sink.clone());
    scheduler.start()?;

    let (saved_tx, mut saved_rx) = tokio::sync::mpsc::channel(32);
    let mut watcher = MirrorWatcher::new(ctx.mirror.dir().to_path_buf());
    watcher
        .start(saved_tx)
        .map_err(Error::config)?;

    println!(
        "Attached. Watching {} for edits; Ctrl-C to exit.",
        ctx.mirror.dir().display()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(path) = saved_rx.recv() => {
                match ctx.mirror.on_saved(&ctx.session, &path, sink.clone()).await {
                    Ok(SaveAction::Config(SyncOutcome::Saved)) => println!("Config saved"),
                    Ok(SaveAction::Config(SyncOutcome::Unchanged)) => {
                        println!("Config not changed. Save aborted.")
                    }
                    Ok(SaveAction::Uploaded(_)) => println!("File saved"),
                    Ok(SaveAction::Ignored) => {}
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    scheduler.stop();
    watcher.stop();
    info!("Detached");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_raw_command_strips_tool_name() {
        assert_eq!(
            normalize_raw_command("mos", "mos build --local"),
            vec!["build", "--local"]
        );
        assert_eq!(normalize_raw_command("mos", "MOS ls"), vec!["ls"]);
    }

    #[test]
    fn test_normalize_raw_command_passthrough() {
        assert_eq!(
            normalize_raw_command("mos", "  flash  "),
            vec!["flash"]
        );
    }

    #[test]
    fn test_normalize_raw_command_empty() {
        assert!(normalize_raw_command("mos", "").is_empty());
        assert!(normalize_raw_command("mos", "   ").is_empty());
        assert!(normalize_raw_command("mos", "mos").is_empty());
    }

    #[test]
    fn test_context_load_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.tool = "definitely-not-a-real-tool-xyz".to_string();
        save_settings(dir.path(), &settings).unwrap();

        let err = Context::load(dir.path().to_path_buf(), None, None).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[test]
    fn test_context_load_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.tool = "sh".to_string();
        save_settings(dir.path(), &settings).unwrap();

        let ctx = Context::load(
            dir.path().to_path_buf(),
            Some("/dev/ttyUSB9".to_string()),
            Some("ESP32".to_string()),
        )
        .unwrap();
        assert_eq!(ctx.session.port().as_deref(), Some("/dev/ttyUSB9"));
        assert_eq!(ctx.session.board().as_deref(), Some("ESP32"));
    }
}
