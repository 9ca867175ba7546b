use clap::Parser;
use station_summarizer::cli::{run, Cli};
use station_summarizer::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
