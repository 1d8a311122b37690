//! Administrative command line for fizzboxd.
//!
//! ```text
//! fizzboxctl run <channel> <guild> <!command ...>   run a chat command as an administrator
//! fizzboxctl list                                  print every subscription and its history size
//! fizzboxctl poll                                  run one diary cycle now
//! ```

use std::sync::Arc;

use anyhow::Result;
use anyhow::anyhow;
use dotenv::dotenv;
use fizzboxd::bot::commands::CommandContext;
use fizzboxd::bot::commands::CommandHandler;
use fizzboxd::config::Config;
use fizzboxd::delivery::discord_channel_delivery::DiscordChannelDelivery;
use fizzboxd::feed::letterboxd_platform::LetterboxdPlatform;
use fizzboxd::repository::Repository;
use fizzboxd::service::Services;

const USAGE: &str = "usage: fizzboxctl run <channel> <guild> <!command ...> | list | poll";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = Config::new();
    config.load()?;

    let repo = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);
    repo.run_migrations().await?;

    let platform = Arc::new(LetterboxdPlatform::new(
        &config.feed_base_url,
        config.fetch_timeout,
    )?);
    let delivery = Arc::new(DiscordChannelDelivery::new(
        &config.discord_api_url,
        &config.discord_token,
        config.delivery_timeout,
    ));
    let services = Services::new(repo.clone(), platform, delivery, config.entry_limit);

    let result = dispatch(&args, &config, &services).await;

    repo.close().await;
    result
}

async fn dispatch(args: &[String], config: &Config, services: &Services) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("run") if args.len() >= 4 => {
            let handler = CommandHandler::new(services.subscription.clone());
            let ctx = CommandContext {
                destination: &args[1],
                group: &args[2],
                is_admin: true,
            };
            match handler.handle(&args[3..].join(" "), ctx).await? {
                Some(reply) => println!("{reply}"),
                None => println!("Not a command."),
            }
        }
        Some("list") => {
            let grouped = services
                .subscription
                .list_all_subscriptions_by_subscriber()
                .await?;
            for (subscriber, subscriptions) in grouped {
                for s in subscriptions {
                    println!("{subscriber}\t{}\t{} seen", s.destination, s.history.len());
                }
            }
        }
        Some("poll") => {
            config.require_discord_token()?;
            let report = services
                .diary_feed
                .check_updates(config.fetch_concurrency)
                .await?;
            println!("{report}");
        }
        _ => return Err(anyhow!(USAGE)),
    }
    Ok(())
}
