use clap::Parser;
use resilient_joke::utils::{logger, validation::Validate};
use resilient_joke::{CliConfig, JokeGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting resilient-joke CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = cli.load()?;

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let registry = config.policy_registry();
    let client = config.build_client(&registry)?;

    for _ in 0..cli.count.max(1) {
        let category = match cli.requested_category() {
            Some(category) => category,
            None => client.random_category().await,
        };
        let joke = client.joke(&category).await;
        println!("[{}] {}", joke.category(), joke.text());
    }

    let metrics = client.policy().circuit_breaker().metrics();
    tracing::info!(
        "📊 Circuit breaker {:?}, buffered calls: {}, failed: {}, not permitted: {}",
        metrics.state,
        metrics.buffered_calls,
        metrics.failed_calls,
        metrics.not_permitted_calls
    );

    Ok(())
}
