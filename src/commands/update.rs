use anyhow::{Context, Result};

use mrfcheck::config::Settings;

pub async fn update_command(settings: &Settings) -> Result<()> {
    let mut repository = settings.repository();
    repository
        .ensure()
        .await
        .context("Failed to prepare the schema repository")?;
    repository
        .update()
        .await
        .context("Failed to fetch new schema versions")?;

    let tags = repository.list_tags().await?;
    match tags.last() {
        Some(latest) => println!("{} schema version(s) available, latest {latest}", tags.len()),
        None => println!("No schema versions available"),
    }
    Ok(())
}
