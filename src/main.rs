use clap::Parser;

#[tokio::main]
async fn main() {
    lessonforge::init_tracing();
    tracing::info!("{} starting v{}", lessonforge::config::APP_NAME, lessonforge::config::APP_VERSION);

    if let Err(e) = lessonforge::cli::Cli::parse().run().await {
        tracing::error!(error = %e, "Run failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
