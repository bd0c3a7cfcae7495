//! Just enough IRC for Twitch chat: parsing incoming lines (with IRCv3 tags)
//! and formatting the handful of commands the bot sends.

use std::collections::HashMap;

use chattext_channels::ChatRequest;

/// One parsed IRC line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a single line. Returns `None` for blank or command-less lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        let mut message = Self::default();

        if let Some(tagged) = rest.strip_prefix('@') {
            let (tags, tail) = tagged.split_once(' ')?;
            message.tags = tags
                .split(';')
                .filter(|tag| !tag.is_empty())
                .map(|tag| match tag.split_once('=') {
                    Some((key, value)) => (key.to_string(), unescape_tag_value(value)),
                    None => (tag.to_string(), String::new()),
                })
                .collect();
            rest = tail;
        }

        rest = rest.trim_start();
        if let Some(prefixed) = rest.strip_prefix(':') {
            let (prefix, tail) = prefixed.split_once(' ')?;
            message.prefix = Some(prefix.to_string());
            rest = tail;
        }

        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                message.params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    message.params.push(param.to_string());
                    rest = tail;
                },
                None => {
                    message.params.push(rest.to_string());
                    break;
                },
            }
        }

        if message.params.is_empty() {
            return None;
        }
        message.command = message.params.remove(0).to_uppercase();
        Some(message)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .and_then(|prefix| prefix.split_once('!'))
            .map(|(nick, _)| nick)
    }

    /// Last parameter, usually the message body.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Moderator rights as Twitch reports them: the `mod` tag, or a
    /// broadcaster or moderator badge.
    pub fn is_moderator(&self) -> bool {
        if self.tag("mod") == Some("1") {
            return true;
        }
        self.tag("badges").is_some_and(|badges| {
            badges
                .split(',')
                .filter_map(|badge| badge.split('/').next())
                .any(|name| name == "broadcaster" || name == "moderator")
        })
    }

    /// A chat request for `PRIVMSG` lines, `None` for anything else.
    pub fn to_chat_request(&self) -> Option<ChatRequest> {
        if self.command != "PRIVMSG" || self.params.len() < 2 {
            return None;
        }
        Some(ChatRequest {
            channel: self.params[0].trim_start_matches('#').to_string(),
            author: self.nick()?.to_string(),
            is_moderator: self.is_moderator(),
            text: self.trailing()?.to_string(),
        })
    }
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {},
        }
    }
    out
}

/// Line breaks would end the IRC line early and smuggle in a second command.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

pub fn cap_req() -> String {
    "CAP REQ :twitch.tv/tags twitch.tv/commands".into()
}

pub fn pass(token: &str) -> String {
    format!("PASS {}", single_line(token))
}

pub fn nick(nick: &str) -> String {
    format!("NICK {}", single_line(nick))
}

pub fn join(channels: &[String]) -> String {
    let list: Vec<String> = channels.iter().map(|c| format!("#{c}")).collect();
    format!("JOIN {}", list.join(","))
}

pub fn privmsg(channel: &str, text: &str) -> String {
    format!("PRIVMSG #{channel} :{}", single_line(text))
}

pub fn pong(payload: Option<&str>) -> String {
    match payload {
        Some(payload) => format!("PONG :{payload}"),
        None => "PONG".into(),
    }
}
