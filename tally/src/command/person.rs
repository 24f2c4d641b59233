use clap::Parser;
use eyre::Result;
use tally_client::app::{App, PersonOutcome};
use tally_client::form::PersonDraft;
use tally_common::domain::PersonType;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Create a person that person tiles can refer to
    Add {
        name: String,
        /// Social, Pro or Romance
        #[arg(short = 't', long = "type", default_value = "Social")]
        kind: PersonType,
        /// dd/mm/yyyy
        #[arg(long)]
        first_met: Option<String>,
        /// Also pin the new person to the top of person pickers
        #[arg(short, long)]
        favorite: bool,
    },
    /// List people from the config
    List,
}

impl Cmd {
    pub(crate) async fn run(self, app: &App) -> Result<()> {
        match self {
            Self::Add {
                name,
                kind,
                first_met,
                favorite,
            } => {
                let draft = PersonDraft {
                    name,
                    kind,
                    first_met,
                };
                let person_id = match super::accepted(app.create_person(&draft).await?)? {
                    PersonOutcome::Created(person) => {
                        println!("Added {} ({})", person.label(), person.person_id);
                        person.person_id
                    }
                    PersonOutcome::Queued(payload) => {
                        println!("Queued {} ({})", payload.name, payload.person_id);
                        payload.person_id
                    }
                };
                if favorite {
                    app.favorites().add(&person_id).await?;
                }
            }
            Self::List => {
                let Some(config) = app.load_config(false).await?.config else {
                    println!("Config unavailable.");
                    return Ok(());
                };
                let favorites = app.favorites().list().await?;
                for person in tally_client::catalog::people(&config) {
                    let star = if favorites.contains(&person.person_id) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{star} {:<10} {:<8} {}",
                        person.person_id,
                        person.kind,
                        person.label()
                    );
                }
            }
        }

        Ok(())
    }
}
