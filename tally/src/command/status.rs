use eyre::Result;
use tally_client::app::App;

pub(crate) async fn run(app: &App) -> Result<()> {
    let state = if !app.credentials().is_complete() {
        "Not configured"
    } else if app.is_online().await {
        "Online"
    } else {
        "Offline"
    };

    println!("{state}");
    println!("Pending: {}", app.queue().len().await?);
    Ok(())
}
