use clap::Parser;
use eyre::Result;
use tally_client::app::{App, SubmitOutcome};
use tally_client::form::WeeklyDraft;
use time::OffsetDateTime;

#[derive(Parser, Debug)]
pub struct Cmd {
    /// dd/mm/yyyy, defaults to the Monday of the current week
    #[arg(long)]
    week_start: Option<String>,
    #[arg(long)]
    work_hours: Option<f64>,
    #[arg(long)]
    expenses: Option<f64>,
    /// Renovation spending kept out of personal expenses
    #[arg(long)]
    renovation: Option<f64>,
    #[arg(long)]
    net_worth: Option<f64>,
    #[arg(long)]
    deal_spike: bool,
    #[arg(short, long, default_value = "")]
    notes: String,
}

impl Cmd {
    pub(crate) async fn run(self, app: &App) -> Result<()> {
        let week_start = self
            .week_start
            .unwrap_or_else(|| app.clock.default_week_start(OffsetDateTime::now_utc()));

        let draft = WeeklyDraft {
            week_start,
            work_hours: self.work_hours,
            expenses_personal: self.expenses,
            excluded_renovation: self.renovation,
            net_worth: self.net_worth,
            deal_spike: self.deal_spike,
            notes: self.notes,
        };

        match super::accepted(app.submit_weekly(&draft).await?)? {
            SubmitOutcome::Sent => println!("Weekly saved for {}", draft.week_start),
            SubmitOutcome::Queued => println!("Weekly queued for {}", draft.week_start),
        }

        Ok(())
    }
}
