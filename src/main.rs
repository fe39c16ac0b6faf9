#[tokio::main]
async fn main() {
    if let Err(e) = studio_lib::run().await {
        // Logging may not be up yet if configuration failed.
        eprintln!("component-studio: {e}");
        tracing::error!(error = %e, "Studio exited with error");
        std::process::exit(1);
    }
}
