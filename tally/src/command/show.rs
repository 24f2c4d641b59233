use clap::Parser;
use eyre::{bail, Result};
use tally_client::app::App;
use tally_client::form::{EventForm, ValueInput};

#[derive(Parser, Debug)]
pub struct Cmd {
    /// Tile id, e.g. T_MEET
    tile: String,
}

impl Cmd {
    pub(crate) async fn run(self, app: &App) -> Result<()> {
        let Some(form) = app.event_form(&self.tile).await? else {
            bail!("Unknown tile {}", self.tile);
        };
        print_form(&form, &app.default_backdate());
        Ok(())
    }
}

pub(crate) fn print_form(form: &EventForm, backdate: &str) {
    println!("{} ({})", form.tile.label(), form.tile.metric_code);

    match &form.value {
        ValueInput::Adjustable {
            default,
            step,
            presets,
        } => {
            println!("Value: {default} {} (step {step})", form.unit);
            if !presets.is_empty() {
                println!("Presets: {}", presets.join(", "));
            }
        }
        ValueInput::Fixed(value) => println!("Value: {value} {}", form.unit),
    }

    if let Some(tags) = &form.tags {
        println!("Tags (required): {}", tags.join(", "));
    }

    if let Some(people) = &form.people {
        println!("Person (required):");
        if people.is_empty() {
            println!("  none yet, add one with `tally person add`");
        }
        for choice in people {
            let star = if choice.favorite { "*" } else { " " };
            println!(
                " {star} {:<10} {}",
                choice.person.person_id,
                choice.person.label()
            );
        }
    }

    if let Some(templates) = &form.templates {
        println!("Template (required):");
        for template in templates {
            println!("   {:<10} {}", template.drink_template_id, template.name);
        }
    }

    println!("Backdate (optional): --at \"{backdate}\"");
}
