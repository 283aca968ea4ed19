// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of the operator command surface. Pure text in, command out;
//! execution lives with the audience handlers.

use tessera_core::{ChatId, TicketId};

/// A privileged worker command.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCommand {
    /// `/accept <ticket>` - claim an open ticket.
    Accept(TicketId),
    /// `/close <ticket> <profit> [remarks...]` - close a completed ticket.
    Close {
        ticket: TicketId,
        profit: f64,
        remarks: Option<String>,
    },
    /// `/drop <ticket> [remarks...]` - close without completion.
    Drop {
        ticket: TicketId,
        remarks: Option<String>,
    },
    /// `/paid <ticket>` - mark the customer's payment received.
    Paid(TicketId),
    /// `/log <ticket>` - ask the log providers for this ticket's log.
    RequestLog(TicketId),
    /// `/ban <chat>` - ban a customer and cascade-close their tickets.
    Ban(ChatId),
    /// `/unban <chat>`.
    Unban(ChatId),
    /// `/setname <alias>` - set the caller's display alias.
    SetName(String),
    /// `/report` - ledger totals.
    Report,
    /// `/work` - the open-ticket panel.
    Panel,
}

/// A log-provider command.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCommand {
    /// `/provide <ticket> <content>` - deliver a log for a ticket.
    Provide { ticket: TicketId, content: String },
    /// `/panel` - tickets currently waiting on a log.
    Panel,
}

/// Why a command line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not a command at all (no leading slash).
    NotACommand,
    /// Unknown command name.
    Unknown(String),
    /// Recognized command, malformed arguments. Carries usage text.
    Usage(&'static str),
}

fn parse_ticket(arg: &str) -> Option<TicketId> {
    arg.trim_start_matches('#').parse().ok().map(TicketId)
}

fn parse_chat(arg: &str) -> Option<ChatId> {
    arg.parse().ok().map(ChatId)
}

/// Split `"/cmd@botname rest"` into the bare command name and the remainder.
fn split_command(text: &str) -> Option<(String, &str)> {
    let trimmed = text.trim();
    let rest = trimmed.strip_prefix('/')?;
    let (head, tail) = match rest.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (rest, ""),
    };
    // Commands in group chats arrive as /cmd@botname.
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    Some((name, tail))
}

pub fn parse_worker_command(text: &str) -> Result<WorkerCommand, ParseError> {
    let (name, args) = split_command(text).ok_or(ParseError::NotACommand)?;
    let mut words = args.split_whitespace();
    match name.as_str() {
        "accept" => {
            let ticket = words
                .next()
                .and_then(parse_ticket)
                .ok_or(ParseError::Usage("/accept <ticket>"))?;
            Ok(WorkerCommand::Accept(ticket))
        }
        "close" => {
            let usage = ParseError::Usage("/close <ticket> <profit> [remarks]");
            let ticket = words.next().and_then(parse_ticket).ok_or(usage.clone())?;
            let profit: f64 = words
                .next()
                .and_then(|w| w.trim_start_matches('$').parse().ok())
                .ok_or(usage)?;
            let remarks = remainder(&mut words);
            Ok(WorkerCommand::Close {
                ticket,
                profit,
                remarks,
            })
        }
        "drop" => {
            let ticket = words
                .next()
                .and_then(parse_ticket)
                .ok_or(ParseError::Usage("/drop <ticket> [remarks]"))?;
            let remarks = remainder(&mut words);
            Ok(WorkerCommand::Drop { ticket, remarks })
        }
        "paid" => {
            let ticket = words
                .next()
                .and_then(parse_ticket)
                .ok_or(ParseError::Usage("/paid <ticket>"))?;
            Ok(WorkerCommand::Paid(ticket))
        }
        "log" => {
            let ticket = words
                .next()
                .and_then(parse_ticket)
                .ok_or(ParseError::Usage("/log <ticket>"))?;
            Ok(WorkerCommand::RequestLog(ticket))
        }
        "ban" => {
            let chat = words
                .next()
                .and_then(parse_chat)
                .ok_or(ParseError::Usage("/ban <chat id>"))?;
            Ok(WorkerCommand::Ban(chat))
        }
        "unban" => {
            let chat = words
                .next()
                .and_then(parse_chat)
                .ok_or(ParseError::Usage("/unban <chat id>"))?;
            Ok(WorkerCommand::Unban(chat))
        }
        "setname" => {
            if args.is_empty() {
                return Err(ParseError::Usage("/setname <alias>"));
            }
            Ok(WorkerCommand::SetName(args.to_string()))
        }
        "report" => Ok(WorkerCommand::Report),
        "work" => Ok(WorkerCommand::Panel),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

pub fn parse_provider_command(text: &str) -> Result<ProviderCommand, ParseError> {
    let (name, args) = split_command(text).ok_or(ParseError::NotACommand)?;
    match name.as_str() {
        // `/log` is the historical spelling providers are used to.
        "provide" | "log" => {
            let usage = ParseError::Usage("/provide <ticket> <log content>");
            let (ticket_word, content) = args
                .split_once(char::is_whitespace)
                .ok_or(usage.clone())?;
            let ticket = parse_ticket(ticket_word).ok_or(usage.clone())?;
            let content = content.trim();
            if content.is_empty() {
                return Err(usage);
            }
            Ok(ProviderCommand::Provide {
                ticket,
                content: content.to_string(),
            })
        }
        "panel" => Ok(ProviderCommand::Panel),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn remainder(words: &mut std::str::SplitWhitespace<'_>) -> Option<String> {
    let rest = words.collect::<Vec<_>>().join(" ");
    if rest.is_empty() { None } else { Some(rest) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_parses_with_and_without_hash() {
        assert_eq!(
            parse_worker_command("/accept 61"),
            Ok(WorkerCommand::Accept(TicketId(61)))
        );
        assert_eq!(
            parse_worker_command("/accept #61"),
            Ok(WorkerCommand::Accept(TicketId(61)))
        );
    }

    #[test]
    fn close_parses_profit_and_remarks() {
        assert_eq!(
            parse_worker_command("/close 61 100 smooth order"),
            Ok(WorkerCommand::Close {
                ticket: TicketId(61),
                profit: 100.0,
                remarks: Some("smooth order".to_string()),
            })
        );
        assert_eq!(
            parse_worker_command("/close 61 $62.50"),
            Ok(WorkerCommand::Close {
                ticket: TicketId(61),
                profit: 62.5,
                remarks: None,
            })
        );
        assert!(matches!(
            parse_worker_command("/close 61"),
            Err(ParseError::Usage(_))
        ));
    }

    #[test]
    fn bot_suffix_is_stripped() {
        assert_eq!(
            parse_worker_command("/report@tessera_bot"),
            Ok(WorkerCommand::Report)
        );
    }

    #[test]
    fn non_commands_and_unknowns_are_distinguished() {
        assert_eq!(
            parse_worker_command("hello there"),
            Err(ParseError::NotACommand)
        );
        assert_eq!(
            parse_worker_command("/frobnicate"),
            Err(ParseError::Unknown("frobnicate".to_string()))
        );
    }

    #[test]
    fn provider_log_spelling_is_accepted() {
        assert_eq!(
            parse_provider_command("/log 61 the log"),
            Ok(ProviderCommand::Provide {
                ticket: TicketId(61),
                content: "the log".to_string(),
            })
        );
    }

    #[test]
    fn provide_requires_content() {
        assert_eq!(
            parse_provider_command("/provide 61 account log here"),
            Ok(ProviderCommand::Provide {
                ticket: TicketId(61),
                content: "account log here".to_string(),
            })
        );
        assert!(matches!(
            parse_provider_command("/provide 61"),
            Err(ParseError::Usage(_))
        ));
    }

    #[test]
    fn setname_takes_full_remainder() {
        assert_eq!(
            parse_worker_command("/setname Night Shift"),
            Ok(WorkerCommand::SetName("Night Shift".to_string()))
        );
    }
}
