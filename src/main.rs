use anyhow::Result;
use scoresync::utils::logging;
use scoresync::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env();

    let app = App::initialize(config).await?;
    app.run().await?;

    Ok(())
}
