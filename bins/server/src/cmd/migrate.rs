use crate::config::{ConfigArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ConfigArgs) -> Result<(), ServerError> {
    let config = ServerConfig::load(&args.config)?;
    super::open_store(&config).await?;
    println!("Database migration successful");
    Ok(())
}
