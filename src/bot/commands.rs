//! `!`-prefixed text commands and their replies.

use std::sync::Arc;

use log::debug;

use crate::service::error::ServiceError;
use crate::service::subscription_service::SubscriptionService;

pub const COMMAND_PREFIX: char = '!';

pub const HELP_TEXT: &str = "**!follow <username>** - follows a user in this channel
**!unfollow <username>** - unfollows a user in this channel
**!following** - shows the list of currently followed users in this channel
**!help** - shows this help message";

/// A parsed command. Usernames are kept as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Follow { username: Option<String> },
    Unfollow { username: Option<String> },
    Following,
    Help,
}

impl Command {
    /// Parses a chat message. Anything that is not a known command yields
    /// `None`.
    pub fn parse(content: &str) -> Option<Command> {
        if !content.starts_with(COMMAND_PREFIX) {
            return None;
        }
        let mut words = content.split_whitespace();
        let name = words.next()?.to_lowercase();
        let username = words.next().map(str::to_string);

        match name.as_str() {
            "!follow" => Some(Command::Follow { username }),
            "!unfollow" => Some(Command::Unfollow { username }),
            "!following" => Some(Command::Following),
            "!help" => Some(Command::Help),
            _ => None,
        }
    }

    /// Whether only administrators may run the command.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Command::Follow { .. } | Command::Unfollow { .. })
    }
}

/// Where a command was issued and by whom.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// Channel the command was sent in; follows are scoped to it.
    pub destination: &'a str,
    /// Guild of the channel.
    pub group: &'a str,
    pub is_admin: bool,
}

pub struct CommandHandler {
    subscriptions: Arc<SubscriptionService>,
}

impl CommandHandler {
    pub fn new(subscriptions: Arc<SubscriptionService>) -> Self {
        Self { subscriptions }
    }

    /// Runs the command in `content` and returns the reply, if any.
    ///
    /// Unknown commands and mutating commands from non-administrators get
    /// no reply.
    pub async fn handle(
        &self,
        content: &str,
        ctx: CommandContext<'_>,
    ) -> Result<Option<String>, ServiceError> {
        let Some(command) = Command::parse(content) else {
            return Ok(None);
        };
        if command.is_mutating() && !ctx.is_admin {
            debug!("Ignoring {command:?} from a non-administrator.");
            return Ok(None);
        }

        let reply = match command {
            Command::Follow { username } => {
                self.follow(username.as_deref(), ctx.destination, ctx.group)
                    .await?
            }
            Command::Unfollow { username } => {
                self.unfollow(username.as_deref(), ctx.destination).await?
            }
            Command::Following => self.following(ctx.destination).await?,
            Command::Help => HELP_TEXT.to_string(),
        };
        Ok(Some(reply))
    }

    pub async fn follow(
        &self,
        username: Option<&str>,
        destination: &str,
        group: &str,
    ) -> Result<String, ServiceError> {
        let Some(username) = username else {
            return Ok("Usage: `!follow <username>`".to_string());
        };
        let username = SubscriptionService::normalize_subscriber(username);

        match self
            .subscriptions
            .subscribe(&username, destination, group)
            .await
        {
            Ok(()) => Ok(format!("Now following {username} in this channel.")),
            Err(ServiceError::Conflict { .. }) => {
                Ok(format!("Already following {username} in this channel."))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn unfollow(
        &self,
        username: Option<&str>,
        destination: &str,
    ) -> Result<String, ServiceError> {
        let Some(username) = username else {
            return Ok("Usage: `!unfollow <username>`".to_string());
        };
        let username = SubscriptionService::normalize_subscriber(username);

        match self
            .subscriptions
            .unsubscribe(&username, destination)
            .await?
        {
            0 => Ok(format!(
                "Can't unfollow {username}, username not in the list of followed users in this channel."
            )),
            _ => Ok(format!(
                "{username} is no longer being followed in this channel."
            )),
        }
    }

    pub async fn following(&self, destination: &str) -> Result<String, ServiceError> {
        let names = self.subscriptions.list_subscribers(destination).await?;
        if names.is_empty() {
            return Ok("Not following anyone in this channel.".to_string());
        }
        Ok(format!(
            "Following the following Letterboxd usernames in this channel: {}",
            names.join(", ")
        ))
    }
}
