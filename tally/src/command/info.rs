use eyre::Result;
use tally_client::api_client::BackendFlavor;
use tally_client::app::App;
use tally_client::config_cache::CONFIG_KEY;

use crate::VERSION;

pub(crate) async fn run(app: &App) -> Result<()> {
    let env_config_dir = std::env::var("TALLY_CONFIG_DIR");
    let config_file = tally_common::utils::config_dir().join("config.toml");

    let vars = format!(
        "VARS:\nTALLY_CONFIG_DIR = {:?}",
        env_config_dir.unwrap_or("None".into())
    );
    println!("{vars}\n");

    let mut paths = String::from("PATHS:\n");
    paths.push_str(&format!("config_path: {config_file:?}\n"));
    paths.push_str(&format!("db_path: {:?}", app.settings.db_path));
    println!("{paths}\n");

    let credentials = app.credentials();
    println!("BACKEND:");
    println!("Url: {}", or_unset(&credentials.backend_url));
    println!("Token: {}", or_unset(&credentials.masked_token()));
    println!("Dashboard: {}", or_unset(&credentials.dashboard_url));
    println!("Flavor: {:?}", BackendFlavor::detect(&credentials.backend_url));
    println!("Reference offset: {}", app.clock.offset());

    println!();
    println!(
        "Config cached: {}",
        if app.db.get_raw(CONFIG_KEY).await?.is_some() {
            "yes"
        } else {
            "no"
        }
    );
    println!("Pending: {}", app.queue().len().await?);

    println!();
    println!("Version: {VERSION}");
    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "Unset"
    } else {
        value
    }
}
