use dailymotion::{ApiCredentials, ApiKeyType, ClientConfig, Field, Scope, http_client};
use eyre::Context;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let key =
        env("DAILYMOTION_API_KEY").ok_or_else(|| eyre::eyre!("DAILYMOTION_API_KEY is not set"))?;
    let secret = env("DAILYMOTION_API_SECRET")
        .ok_or_else(|| eyre::eyre!("DAILYMOTION_API_SECRET is not set"))?;
    let key_type: ApiKeyType = match env("DAILYMOTION_KEY_TYPE") {
        Some(kind) => kind.parse().context("parse DAILYMOTION_KEY_TYPE")?,
        None => ApiKeyType::Public,
    };
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let query = if query.is_empty() { "news".to_string() } else { query };

    let config = ClientConfig::default();
    tracing::info!(host = %config.base_url_for(key_type), ?key_type, "connecting");
    let mut dm = http_client(ApiCredentials::new(&key, &secret, key_type), config)?;

    let token = match (env("DAILYMOTION_USERNAME"), env("DAILYMOTION_PASSWORD")) {
        (Some(username), Some(password)) => {
            dm.auth_mut()
                .authenticate_with_password(&username, &password, &[Scope::Userinfo])
                .await
        }
        _ => {
            dm.auth_mut()
                .authenticate_with_client_credentials(&key, &secret, key_type, &[])
                .await
        }
    };
    if !token.is_authenticated() {
        eyre::bail!("authentication failed");
    }

    match dm.auth().validate_token().await {
        Some(info) => eprintln!(
            "==> token ok (scopes: {})",
            if info.scope.is_empty() {
                "none".to_string()
            } else {
                info.scope.join(" ")
            }
        ),
        None => eprintln!("==> token could not be validated"),
    }

    eprintln!("==> searching for {query:?}");
    let page = dm
        .search_videos(&query, &[Field::Id, Field::Title, Field::Duration])
        .await
        .context("search videos")?;
    for video in &page.list {
        let duration = video
            .duration()
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{}\t{}\t{}",
            video.id().unwrap_or_default(),
            duration,
            video.title().unwrap_or_default()
        );
    }
    if page.has_more {
        eprintln!("(more results on page {})", page.page + 1);
    }

    Ok(())
}
