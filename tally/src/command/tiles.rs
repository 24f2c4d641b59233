use clap::Parser;
use eyre::Result;
use tally_client::app::App;
use tally_client::catalog;
use tally_client::config_cache::Freshness;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub struct Cmd {
    /// Fetch the config from the backend even when a cached copy exists
    #[arg(short, long)]
    refresh: bool,
}

impl Cmd {
    pub(crate) async fn run(self, app: &App) -> Result<()> {
        let loaded = app.load_config(self.refresh).await?;

        let Some(config) = loaded.config else {
            println!("Config unavailable. Check the backend settings and connection.");
            return Ok(());
        };
        if self.refresh && loaded.freshness == Freshness::Cached {
            println!("Could not refresh, showing cached config.\n");
        }

        let groups = catalog::tile_groups(&config);
        if groups.is_empty() {
            println!("No active tiles.");
            return Ok(());
        }

        for group in groups {
            println!("{}", group.label);
            for (tile, metric) in group.tiles {
                let unit = if tile.unit.is_empty() {
                    &metric.default_unit
                } else {
                    &tile.unit
                };
                println!("  {:<24} {} {}", tile.tile_id, tile.label(), unit);
            }
            println!();
        }

        Ok(())
    }
}
