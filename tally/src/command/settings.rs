use clap::Parser;
use eyre::Result;
use tally_client::app::App;
use tally_client::settings::Credentials;

use super::{read_input, read_input_hidden};

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Print the stored backend settings
    Show,
    /// Store backend settings. Omitted values are prompted for; a blank answer
    /// keeps the current value.
    Set {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        dashboard: Option<String>,
    },
    /// Check the stored settings against the backend
    Test,
}

impl Cmd {
    pub(crate) async fn run(self, app: &mut App) -> Result<()> {
        match self {
            Self::Show => {
                let credentials = app.credentials();
                println!("Backend URL: {}", credentials.backend_url);
                println!("API token: {}", credentials.masked_token());
                println!("Dashboard URL: {}", credentials.dashboard_url);
            }
            Self::Set {
                url,
                token,
                dashboard,
            } => {
                let current = app.credentials().clone();
                let url = match url {
                    Some(url) => url,
                    None => keep_if_blank(read_input("backend url")?, &current.backend_url),
                };
                let token = match token {
                    Some(token) => token,
                    None => keep_if_blank(read_input_hidden("api token")?, &current.api_token),
                };
                let dashboard = match dashboard {
                    Some(dashboard) => dashboard,
                    None => keep_if_blank(read_input("dashboard url")?, &current.dashboard_url),
                };

                app.save_credentials(Credentials::new(&url, &token, &dashboard))
                    .await?;
                println!("Saved");
            }
            Self::Test => {
                let credentials = app.credentials().clone();
                println!("{}", app.test_connection(&credentials).await);
            }
        }

        Ok(())
    }
}

fn keep_if_blank(input: String, current: &str) -> String {
    if input.trim().is_empty() {
        current.to_string()
    } else {
        input
    }
}
