use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neuroevolution::cli::Args;
use neuroevolution::evolution;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    println!("Running NEAT for {}", args.env);
    let settings = args.settings();
    let outcome = evolution::run(&settings).await?;

    for plot in &outcome.plots {
        tracing::info!(path = %plot.display(), "plot written");
    }
    Ok(())
}
