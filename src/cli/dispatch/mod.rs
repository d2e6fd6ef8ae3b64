use crate::{cli::actions::Action, idp::IdpConfig};
use anyhow::{Context, Result};
use secrecy::SecretString;
use url::Url;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    // Missing provider settings abort here, before the server binds
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .map(String::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
    };

    let mut config = IdpConfig::new(
        required("region")?,
        required("user-pool-id")?,
        required("client-id")?,
    );

    if let Some(secret) = matches.get_one::<String>("client-secret") {
        config = config.with_client_secret(SecretString::from(secret.to_string()));
    }

    if let Some(endpoint) = matches.get_one::<String>("idp-endpoint") {
        let url = Url::parse(endpoint)
            .with_context(|| format!("invalid identity provider endpoint: {endpoint}"))?;
        config = config.with_endpoint(url);
    }

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        config,
    })
}
