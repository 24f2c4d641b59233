use clap::Parser;
use eyre::Result;
use tally::command::TallyCmd;
use tally::VERSION;

#[derive(Parser)]
#[command(
    author = "Sam Uherek",
    version = VERSION,
    about = "Log life metrics to a personal backend, queueing them while offline",
    )]
struct Tally {
    /// Treat the network as unreachable; everything is queued
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    tally: TallyCmd,
}

impl Tally {
    fn run(self) -> Result<()> {
        self.tally.run(self.offline)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    Tally::parse().run()
}
