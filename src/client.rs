use crate::config::ProviderConfig;
use anyhow::bail;
use octocrab::{Octocrab, OctocrabBuilder};

pub fn get_client(config: &ProviderConfig) -> anyhow::Result<Octocrab> {
    let Some(token) = &config.token else {
        bail!("No GitHub token provided. Set `token` in the provider block or the GITHUB_TOKEN environment variable.")
    };

    let mut builder = OctocrabBuilder::new().personal_token(token.to_string());

    if let Some(base_url) = &config.base_url {
        builder = builder.base_uri(base_url.as_str())?;
    }

    Ok(builder.build()?)
}
