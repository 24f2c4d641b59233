use clap::Subcommand;
use eyre::{eyre, Result};
use tally_client::app::App;
use tally_client::connection::Connectivity;
use tally_client::form::ValidationError;
use tally_client::settings::Settings;
use tracing_subscriber::{self, fmt, prelude::*, EnvFilter};

mod favorites;
mod info;
mod log;
mod person;
mod queue;
mod settings;
mod show;
mod status;
mod tiles;
mod watch;
mod weekly;

#[derive(Subcommand, Debug)]
#[command(infer_subcommands = true)]
pub enum TallyCmd {
    /// List the tiles that can be logged, grouped by category
    Tiles(tiles::Cmd),
    /// Show what a tile asks for
    Show(show::Cmd),
    /// Log an event for a tile
    Log(log::Cmd),
    /// Submit the weekly summary
    Weekly(weekly::Cmd),
    #[command(subcommand)]
    Person(person::Cmd),
    #[command(subcommand)]
    Favorites(favorites::Cmd),
    #[command(subcommand)]
    Queue(queue::Cmd),
    #[command(subcommand)]
    Settings(settings::Cmd),
    /// Connectivity and pending items
    Status,
    /// Paths, credentials and version
    Info,
    /// Stay running and flush whenever the backend becomes reachable
    Watch,
}

impl TallyCmd {
    #[tokio::main]
    pub async fn run(self, offline: bool) -> Result<()> {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();

        tracing::trace!(command = ?self, "tally command");

        let settings = Settings::new()?;
        let connectivity = if offline {
            Connectivity::Forced(false)
        } else {
            Connectivity::Probe {
                timeout: settings.probe_timeout(),
            }
        };
        let mut app = App::new(settings, connectivity).await?;

        if self.flushes_on_start() {
            let report = app.flush(false).await?;
            if report.sent > 0 {
                println!("Sent {} queued item(s)", report.sent);
            }
        }

        match self {
            Self::Tiles(cmd) => cmd.run(&app).await,
            Self::Show(cmd) => cmd.run(&app).await,
            Self::Log(cmd) => cmd.run(&app).await,
            Self::Weekly(cmd) => cmd.run(&app).await,
            Self::Person(cmd) => cmd.run(&app).await,
            Self::Favorites(cmd) => cmd.run(&app).await,
            Self::Queue(cmd) => cmd.run(&app).await,
            Self::Settings(cmd) => cmd.run(&mut app).await,
            Self::Status => status::run(&app).await,
            Self::Info => info::run(&app).await,
            Self::Watch => watch::run(&app).await,
        }
    }

    /// Commands that talk to the backend retry the queue before doing anything else.
    fn flushes_on_start(&self) -> bool {
        matches!(
            self,
            Self::Tiles(_) | Self::Show(_) | Self::Log(_) | Self::Weekly(_) | Self::Person(_)
        )
    }
}

pub(crate) fn read_input(name: &str) -> Result<String> {
    use std::io::Write;

    print!("{name}: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

pub(crate) fn read_input_hidden(name: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{name}: "))?)
}

/// A refused submission becomes an error so the process exits non-zero.
pub(crate) fn accepted<T>(outcome: std::result::Result<T, ValidationError>) -> Result<T> {
    outcome.map_err(|e| eyre!("{e}"))
}
