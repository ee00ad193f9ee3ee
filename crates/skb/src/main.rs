use std::sync::Arc;

use skb_core::{bot::SlackBot, config::Config};
use skb_kubectl::{KubectlConfig, KubectlExecutor};
use skb_slack::SlackMessenger;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), skb_core::Error> {
    skb_core::logging::init("skb")?;

    let cfg = Arc::new(Config::load()?);

    let messenger = SlackMessenger::new(cfg.slack_bot_token.clone(), cfg.slack_api_url.as_deref())?
        .with_ping_interval(cfg.ping_interval);
    let executor = KubectlExecutor::new(KubectlConfig::from_config(&cfg));

    let bot = SlackBot::new(cfg.clone(), Arc::new(messenger), Arc::new(executor));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("Interrupt received");
        on_signal.cancel();
    });

    bot.start(cancel).await
}
