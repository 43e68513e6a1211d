use phonebook_bulk::Generator;

use crate::config::{GenerateArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: GenerateArgs) -> Result<(), ServerError> {
    let config = ServerConfig::load(&args.config.config)?;
    let store = super::open_store(&config).await?;
    let count = args.count.unwrap_or(config.generator.default_count);

    let generator = Generator::new(store, config.generator)?;
    let report = generator.generate_and_persist(count).await?;

    println!("{} phone numbers added successfully", report.persisted);
    println!(
        "  workers: {}, generate: {:?}, persist: {:?}, {:.0} rows/s",
        report.workers,
        report.generation_duration,
        report.persist_duration,
        report.rows_per_second()
    );
    Ok(())
}
