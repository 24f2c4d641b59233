use clap::Parser;
use eyre::Result;
use tally_client::app::App;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// List items waiting to be sent
    Status,
    /// Send queued items now
    Flush,
}

impl Cmd {
    pub(crate) async fn run(self, app: &App) -> Result<()> {
        match self {
            Self::Status => {
                let items = app.queue().all().await?;
                println!("Pending: {}", items.len());
                for item in items {
                    println!(
                        "  {:<7} {:<38} {} attempts={}",
                        item.kind.as_str(),
                        item.id,
                        item.created_at,
                        item.attempts
                    );
                }
            }
            Self::Flush => {
                let report = app.flush(true).await?;
                if report.skipped {
                    println!("Another flush is running");
                } else if report.sent > 0 {
                    println!("Queue flushed");
                }
                println!("Pending: {}", report.retained);
            }
        }

        Ok(())
    }
}
