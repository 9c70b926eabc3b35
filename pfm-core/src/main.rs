//! src/main.rs
//! ============================================================================
//! Line-oriented shell over the file browser core

use std::{
    panic::PanicHookInfo,
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};

use pfm_core::{
    Config, Logger, LoggerConfig,
    controller::{Action, Dispatched, EventLoop, NavigationController},
    fs::{DirectoryLister, PathResolver, SystemMounts},
    model::{DEFAULT_ROW_HEIGHT, NotificationQueue, NotificationSink},
    platform::system_opener,
};

const HELP: &str = "\
commands:
  ls                 list the current location
  pwd                print the current location
  click <y>          click at pixel offset y in the listing
  up                 go to the parent folder
  cd <path|label>    enter a folder or volume
  refresh            re-read the current folder
  copy               copy the selected entry
  paste              paste into the current folder
  cancel             cancel running copies
  config             show settings
  config color <r> <g> <b> <a>
  config outline <r> <g> <b> <a>
  config width <n>
  config save        write settings to disk
  config reset       restore default settings
  quit";

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    setup_panic_handler();

    let config_path: PathBuf = Config::config_path().context("Failed to resolve config path")?;
    let log_dir = config_path
        .parent()
        .map_or_else(|| PathBuf::from("logs"), |dir| dir.join("logs"));

    Logger::init_tracing(&LoggerConfig {
        log_dir,
        ..LoggerConfig::default()
    })
    .context("Failed to initialize logging")?;
    info!("Starting pfm shell");

    let mut shell = Shell::new(config_path).await?;
    shell.run().await.context("Shell runtime error")?;

    info!("Application exited cleanly");
    Ok(())
}

struct Shell {
    event_loop: EventLoop,
    notes: Arc<NotificationQueue>,
    config: Config,
    config_path: PathBuf,
}

impl Shell {
    async fn new(config_path: PathBuf) -> Result<Self> {
        let notes = Arc::new(NotificationQueue::default());
        let config = Config::load_or_reset(&config_path, notes.as_ref()).await;

        let lister = DirectoryLister::new(PathResolver::new(Arc::new(SystemMounts)));
        let mut controller = NavigationController::new(lister, system_opener(), notes.clone())
            .with_row_height(DEFAULT_ROW_HEIGHT);

        let start_dir = tokio::fs::canonicalize(".")
            .await
            .context("Failed to get current directory")?;
        if let Err(e) = controller.enter_directory(&start_dir) {
            warn!("Starting at the volume list: {}", e);
        }

        Ok(Self {
            event_loop: EventLoop::new(controller),
            notes,
            config,
            config_path,
        })
    }

    async fn run(&mut self) -> Result<()> {
        let mut lines: Lines<BufReader<Stdin>> = BufReader::new(tokio::io::stdin()).lines();

        println!("{HELP}");
        self.print_listing();
        self.prompt();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read stdin")? else {
                        break;
                    };

                    if !self.handle_line(line.trim()).await {
                        break;
                    }
                    self.flush_notifications();
                    self.prompt();
                }

                Some(result) = self.event_loop.next_task_result() => {
                    let before = self.event_loop.controller().current().clone();
                    self.event_loop.handle_task_result(result);
                    self.flush_notifications();

                    if self.event_loop.controller().current() != &before {
                        self.print_listing();
                        self.prompt();
                    }
                }
            }
        }

        self.event_loop.shutdown();
        Ok(())
    }

    /// Returns `false` when the shell should exit.
    async fn handle_line(&mut self, line: &str) -> bool {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return true;
        };
        let rest: Vec<&str> = words.collect();

        let action = match (command, rest.as_slice()) {
            ("ls", []) => {
                self.print_listing();
                return true;
            }
            ("pwd", []) => {
                println!("{}", self.event_loop.controller().current());
                return true;
            }
            ("help", []) => {
                println!("{HELP}");
                return true;
            }
            ("config", args) => {
                self.handle_config(args).await;
                return true;
            }
            ("click", [y]) => match y.parse::<f32>() {
                Ok(offset_y) => Action::Click { offset_y },
                Err(_) => {
                    println!("click expects a number, got '{y}'");
                    return true;
                }
            },
            ("up", []) => Action::GoToParent,
            ("cd", []) => {
                println!("cd expects a path or volume label");
                return true;
            }
            ("cd", _) => Action::EnterDirectory(PathBuf::from(rest.join(" "))),
            ("refresh", []) => Action::Refresh,
            ("copy", []) => Action::CopySelected,
            ("paste", []) => Action::Paste,
            ("cancel", []) => Action::CancelAllCopies,
            ("quit" | "exit", []) => Action::Quit,
            _ => {
                println!("unknown command '{line}', try 'help'");
                return true;
            }
        };

        match self.event_loop.dispatch(action) {
            Ok(Dispatched::Quit) => return false,
            Ok(Dispatched::Highlight { index }) => self.print_listing_marked(Some(index)),
            Ok(Dispatched::Opened(path)) => println!("opened {}", path.display()),
            Ok(Dispatched::Copied(path)) => println!("clipboard: {}", path.display()),
            Ok(Dispatched::CopyStarted { operation_id }) => println!("copy {operation_id} started"),
            Ok(Dispatched::Cancelled(n)) => println!("cancelling {n} copy operation(s)"),
            Ok(Dispatched::Disabled) => println!("not available here"),
            Ok(Dispatched::ListingRequested(_) | Dispatched::Ignored) => {}
            Err(e) => warn!("Action failed: {}", e),
        }

        true
    }

    async fn handle_config(&mut self, args: &[&str]) {
        match args {
            [] => println!(
                "highlight {:?}, outline {:?}, width {}",
                self.config.selection_highlight_color,
                self.config.selection_outline_color,
                self.config.selection_highlight_stroke_width
            ),

            ["color", rgba @ ..] => match parse_rgba(rgba) {
                Some(color) => self.config.selection_highlight_color = color,
                None => println!("expected four values 0-255"),
            },

            ["outline", rgba @ ..] => match parse_rgba(rgba) {
                Some(color) => self.config.selection_outline_color = color,
                None => println!("expected four values 0-255"),
            },

            ["width", n] => match n.parse::<u32>() {
                Ok(width) => self.config.selection_highlight_stroke_width = width,
                Err(_) => println!("width expects a whole number, got '{n}'"),
            },

            ["save"] => match self.config.save_to(&self.config_path).await {
                Ok(()) => self.notes.success("Settings saved"),
                Err(e) => self.notes.error(&format!("Cannot save settings: {e}")),
            },

            ["reset"] => match self.config.reset_to(&self.config_path).await {
                Ok(()) => self.notes.info("Settings reset to defaults"),
                Err(e) => self.notes.error(&format!("Cannot reset settings: {e}")),
            },

            _ => println!("unknown config command, try 'help'"),
        }
    }

    fn print_listing(&self) {
        let armed = self.event_loop.controller().armed_index();
        self.print_listing_marked(armed);
    }

    fn print_listing_marked(&self, marked: Option<usize>) {
        let controller = self.event_loop.controller();
        println!("== {} ==", controller.current());

        for (index, entry) in controller.entries().iter().enumerate() {
            let marker = if marked == Some(index) { '>' } else { ' ' };
            let top = index as f32 * DEFAULT_ROW_HEIGHT;
            println!("{marker} {top:>6} {:<4} {}", entry.kind.to_string(), entry.name);
        }

        if controller.entries().is_empty() {
            println!("  (empty)");
        }
    }

    fn flush_notifications(&self) {
        for note in self.notes.drain() {
            println!("[{}] {}", note.level, note.message);
        }
    }

    fn prompt(&self) {
        let controller = self.event_loop.controller();
        let up = if controller.can_go_to_parent() { "up" } else { "--" };
        let paste = if controller.can_paste() { "paste" } else { "-----" };
        println!("[{up}|{paste}] {}>", controller.current());
    }
}

fn parse_rgba(values: &[&str]) -> Option<[u8; 4]> {
    let [r, g, b, a] = values else {
        return None;
    };

    Some([r.parse().ok()?, g.parse().ok()?, b.parse().ok()?, a.parse().ok()?])
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        error!("Application panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}
