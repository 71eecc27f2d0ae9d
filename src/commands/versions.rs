use anyhow::{Context, Result};

use mrfcheck::config::Settings;

pub async fn versions_command(settings: &Settings) -> Result<()> {
    let mut repository = settings.repository();
    repository
        .ensure()
        .await
        .context("Failed to prepare the schema repository")?;

    for tag in repository.list_tags().await? {
        println!("{tag}");
    }
    Ok(())
}
