use clap::Parser;
use eyre::{bail, Result};
use tally_client::app::{App, SubmitOutcome};
use tally_client::form::EventInput;

#[derive(Parser, Debug)]
pub struct Cmd {
    /// Tile id, e.g. T_MEET
    tile: String,
    #[arg(short, long)]
    value: Option<f64>,
    /// Person id, required by person tiles
    #[arg(short, long)]
    person: Option<String>,
    /// Drink template id, required by template tiles
    #[arg(short, long)]
    template: Option<String>,
    /// Comma separated, required by tag tiles
    #[arg(long, default_value = "")]
    tags: String,
    #[arg(short, long, default_value = "")]
    notes: String,
    /// Backdate as dd/mm/yyyy HH:MM in the reference timezone; without a value,
    /// the current reference time
    #[arg(long, num_args = 0..=1, value_name = "DATE_TIME")]
    at: Option<Option<String>>,
}

impl Cmd {
    pub(crate) async fn run(self, app: &App) -> Result<()> {
        let Some(form) = app.event_form(&self.tile).await? else {
            bail!("Unknown tile {}", self.tile);
        };

        let input = EventInput {
            value: self.value,
            person_id: self.person,
            drink_template_id: self.template,
            tags: self.tags,
            notes: self.notes,
            backdate: self.at.map(|at| at.unwrap_or_else(|| app.default_backdate())),
        };

        let outcome = app.log_event(&form, &input).await?;
        if outcome.is_err() {
            super::show::print_form(&form, &app.default_backdate());
        }
        match super::accepted(outcome)? {
            SubmitOutcome::Sent => println!("Logged {}", form.tile.label()),
            SubmitOutcome::Queued => println!("Queued {}", form.tile.label()),
        }

        Ok(())
    }
}
