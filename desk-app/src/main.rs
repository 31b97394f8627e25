use anyhow::Result;
use desk_client::Credentials;
use desk_core::Navigator;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let app = desk_app::build()?;

    // Optional headless sign-in.
    if let (Ok(email), Ok(password)) = (std::env::var("DESK_EMAIL"), std::env::var("DESK_PASSWORD")) {
        let credentials = Credentials::new(email, password);
        if app.session.login(&credentials).await.is_some() {
            if let Err(err) = app.session.refresh_directory().await {
                tracing::warn!(error = %err, "could not load companies");
            }
        }
    }

    let session = app.session.session();
    if let Some(error) = &session.error {
        eprintln!("[desk] {error}");
    }

    println!("[desk] at {}", app.navigator.current_path());
    println!("{}", serde_json::to_string_pretty(&session)?);

    Ok(())
}
