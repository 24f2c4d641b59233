use clap::Parser;
use eyre::Result;
use tally_client::app::App;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    List,
    /// Pin a person to the top of person pickers
    Add { person_id: String },
    Remove { person_id: String },
}

impl Cmd {
    pub(crate) async fn run(self, app: &App) -> Result<()> {
        let favorites = app.favorites();

        match self {
            Self::List => {
                let ids = favorites.list().await?;
                if ids.is_empty() {
                    println!("No favorites");
                }
                for id in ids {
                    println!("{id}");
                }
            }
            Self::Add { person_id } => {
                if favorites.add(&person_id).await? {
                    println!("Added {person_id} to favorites");
                } else {
                    println!("{person_id} is already a favorite");
                }
            }
            Self::Remove { person_id } => {
                if favorites.remove(&person_id).await? {
                    println!("Removed {person_id} from favorites");
                } else {
                    println!("{person_id} is not a favorite");
                }
            }
        }

        Ok(())
    }
}
