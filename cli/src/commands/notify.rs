use anyhow::{anyhow, Result};

use ethc_client::{Notification, Notifier, TelegramContent};

use crate::cli::{Cli, Commands, NotifyCommands};
use crate::{config, log};

pub async fn handle_notify_commands(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Notify(NotifyCommands::Email { message, subject, urgent }) => {
            let email = config::email_notifier()?;

            let notification = if urgent { Notification::urgent(message) } else { Notification::new(message) };
            let notification = match subject {
                Some(subject) => notification.with_subject(subject),
                None => notification,
            };

            email.notify(&notification).await?;
            log::print_success(&format!("Email sent: {}", notification.subject_line()));
        }

        Commands::Notify(NotifyCommands::Telegram {
            message,
            photo,
            document,
            sticker,
            caption,
            parse_mode,
        }) => {
            let mut telegram = config::telegram_notifier()?;
            if let Some(mode) = parse_mode {
                telegram = telegram.with_parse_mode(mode.into());
            }

            let content = match (message, photo, document, sticker) {
                (Some(text), _, _, _) => TelegramContent::Text(text),
                (_, Some(media), _, _) => TelegramContent::Photo { media, caption },
                (_, _, Some(media), _) => TelegramContent::Document { media, caption },
                (_, _, _, Some(sticker)) => TelegramContent::Sticker(sticker),
                _ => return Err(anyhow!("Nothing to send")),
            };

            telegram.send(&content).await?;
            log::print_success(&format!("Telegram {} delivered", content.method()));
        }

        _ => return Err(anyhow!("Not a notify command")),
    }

    Ok(())
}
