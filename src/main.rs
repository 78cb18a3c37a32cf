use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use indoc::indoc;

use selection_toolbar::actions::MenuItem;
use selection_toolbar::background::{BackgroundCoordinator, DesktopBrowser};
use selection_toolbar::clipboard::SystemClipboard;
use selection_toolbar::debug_log::{DebugLogHandle, set_global_debug_log};
use selection_toolbar::playground;
use selection_toolbar::settings::{JsonFileStore, SearchEngine, SettingsStore};
use selection_toolbar::tracing_sub::init_default;

#[derive(Parser, Debug)]
#[command(
    name = "selection-toolbar",
    version = env!("CARGO_PKG_VERSION"),
    about = "Floating toolbar for text selections and editable fields",
    after_help = indoc! {"
        Without a subcommand the interactive playground starts. Inside it:
          drag over text      select and show the selection toolbar
          click a field       show the paste toolbar
          Tab                 move focus to the next field
          Ctrl+T              switch the toolbar on or off
          Ctrl+Q              quit
    "}
)]
struct Cli {
    /// Append logs to this file instead of the in-app log pane.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Settings file to use instead of the one in the user config directory.
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the interactive terminal playground.
    Playground,
    /// Show or change stored settings.
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Switch the toolbar on or off.
    Toggle { state: Switch },
    /// Search the web with the configured engine.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Open a URL in a new background tab.
    Open { url: String },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the effective settings.
    Show,
    /// Choose which buttons the selection toolbar offers.
    Items {
        #[arg(required = true, value_name = "ITEM")]
        items: Vec<MenuItem>,
    },
    /// Choose the search engine.
    Engine { engine: SearchEngine },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::at_default_location().map_err(io::Error::other)?,
    };
    let command = cli.command.unwrap_or(Command::Playground);
    // the playground owns the terminal, so its logs go to the in-app pane
    if matches!(command, Command::Playground) && cli.log_file.is_none() {
        set_global_debug_log(DebugLogHandle::default());
    }
    init_default(cli.log_file.as_deref())?;
    run(command, store)
}

fn background<S: SettingsStore>(store: S) -> BackgroundCoordinator<S, DesktopBrowser> {
    let mut background = BackgroundCoordinator::new(store, DesktopBrowser::new());
    background.start();
    background
}

fn run<S: SettingsStore>(command: Command, store: S) -> io::Result<()> {
    match command {
        Command::Playground => playground::run(SystemClipboard, store),
        Command::Settings { action } => {
            let mut background = background(store);
            match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => {
                    let settings = background.settings();
                    println!("enabled:       {}", settings.enabled);
                    println!("menu items:    {}", settings.enabled_items.join(", "));
                    println!("search engine: {}", settings.search_engine);
                }
                SettingsAction::Items { items } => background
                    .set_enabled_items(&items)
                    .map_err(io::Error::other)?,
                SettingsAction::Engine { engine } => background
                    .set_search_engine(engine)
                    .map_err(io::Error::other)?,
            }
            Ok(())
        }
        Command::Toggle { state } => {
            background(store).toggle_extension(matches!(state, Switch::On));
            Ok(())
        }
        Command::Search { query } => {
            background(store).perform_search(&query.join(" "));
            Ok(())
        }
        Command::Open { url } => {
            background(store).open_in_background_tab(&url);
            Ok(())
        }
    }
}
