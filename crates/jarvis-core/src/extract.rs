//! Parameter extractors.
//!
//! Every extractor is a pure function from the command text to [`Extraction`]: populated
//! [`Params`] or a clarification request. Word removal is token-based, so a file called
//! `photo.jpg` survives stripping the keyword `photo`.

use crate::intent::{Extraction, MessageTarget, Params, YouTubeAction};

/// Raw command plus its lower-cased, trimmed form (the form triggers are evaluated on).
#[derive(Debug, Clone)]
pub struct CommandText<'a> {
    pub raw: &'a str,
    pub lower: String,
}

impl<'a> CommandText<'a> {
    pub fn new(raw: &'a str) -> Self {
        let raw = raw.trim();
        Self {
            raw,
            lower: raw.to_lowercase(),
        }
    }
}

pub const MESSAGING_USAGE: &str =
    "Please say: 'send message to NAME saying YOUR MESSAGE' or 'send file FILENAME to CONTACT'";

/// First whitespace token that is an integer once trailing punctuation is trimmed.
/// Scans left to right; does not look at which keyword the number sits next to.
pub fn first_integer_token(text: &str) -> Option<u64> {
    text.split_whitespace()
        .map(|tok| tok.trim_end_matches(|c: char| matches!(c, '%' | '.' | ',' | '!' | '?')))
        .find(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
        .map(|tok| tok.parse::<u64>().unwrap_or(u64::MAX))
}

/// Drop whole tokens (case-insensitive) and rejoin with single spaces.
pub fn remove_words(text: &str, words: &[&str]) -> String {
    text.split_whitespace()
        .filter(|tok| {
            let lowered = tok.to_lowercase();
            !words.iter().any(|w| *w == lowered)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn remove_phrase(text: &str, phrase: &str) -> String {
    text.replace(phrase, " ")
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric()).any(|tok| tok == word)
}

/// Digits, spaces, dashes and an optional leading `+`, with at least 7 digits, is a phone number.
pub fn classify_target(target: &str) -> MessageTarget {
    let target = target.trim();
    let compact: String = target
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let body = compact.strip_prefix('+').unwrap_or(&compact);
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !body.is_empty() && body.chars().all(|c| c.is_ascii_digit()) && digits >= 7 {
        MessageTarget::Number(compact)
    } else {
        MessageTarget::Contact(target.to_string())
    }
}

pub fn none(_cmd: &CommandText<'_>) -> Extraction {
    Params::None.into()
}

pub fn free_form(cmd: &CommandText<'_>) -> Extraction {
    Params::Text(cmd.raw.to_string()).into()
}

/// "write Hello World" -> "Hello World". Case of the payload is preserved.
pub fn type_text(cmd: &CommandText<'_>) -> Extraction {
    let text = remove_words(cmd.raw, &["write", "type"]);
    if text.is_empty() {
        Extraction::clarify("Please specify what to write. Example: 'write Hello World'")
    } else {
        Params::Text(text).into()
    }
}

/// Three shapes, tried in order:
/// 1. `send file NAME to CONTACT` (also image / photo / document / pdf)
/// 2. `send message to CONTACT saying BODY`
/// 3. `send message to NUMBER message BODY`
pub fn messaging(cmd: &CommandText<'_>) -> Extraction {
    let text = cmd.lower.as_str();

    let is_file = ["file", "image", "photo", "document", "pdf"]
        .iter()
        .any(|w| has_word(text, w));
    if is_file {
        let Some((file_part, contact_part)) = text.split_once(" to ") else {
            return Extraction::clarify("Please say: 'send file FILENAME to CONTACT'");
        };
        let file_name = remove_words(
            file_part,
            &[
                "send", "file", "image", "photo", "document", "pdf", "whatsapp", "the", "a", "my",
            ],
        );
        let contact = contact_part.trim();
        if file_name.is_empty() || contact.is_empty() {
            return Extraction::clarify("Please specify: 'send file FILENAME to CONTACT'");
        }
        return Params::File {
            target: classify_target(contact),
            path: file_name,
        }
        .into();
    }

    if let Some((_, after_to)) = text.split_once(" to ") {
        if let Some((contact, body)) = after_to.split_once(" saying ") {
            let (contact, body) = (contact.trim(), body.trim());
            if contact.is_empty() || body.is_empty() {
                return Extraction::clarify(MESSAGING_USAGE);
            }
            return Params::Message {
                target: classify_target(contact),
                body: body.to_string(),
            }
            .into();
        }

        if has_word(text, "message") || has_word(text, "msg") {
            let mut words = after_to.split_whitespace();
            let Some(recipient) = words.next() else {
                return Extraction::clarify(MESSAGING_USAGE);
            };
            let body = if let Some((_, b)) = after_to.split_once("message") {
                b.trim().to_string()
            } else if let Some((_, b)) = after_to.split_once("msg") {
                b.trim().to_string()
            } else {
                words.collect::<Vec<_>>().join(" ")
            };
            if body.is_empty() {
                return Extraction::clarify(MESSAGING_USAGE);
            }
            return Params::Message {
                target: classify_target(recipient),
                body,
            }
            .into();
        }
    }

    Extraction::clarify(MESSAGING_USAGE)
}

/// City is whatever follows the last " in ", minus trailing filler. No city means "here".
pub fn weather(cmd: &CommandText<'_>) -> Extraction {
    let city = cmd
        .lower
        .rsplit_once(" in ")
        .map(|(_, after)| {
            remove_words(
                after.trim_end_matches(|c: char| c == '?' || c == '.' || c == '!'),
                &["today", "now", "please", "currently", "right"],
            )
        })
        .filter(|c| !c.is_empty());
    Params::City(city).into()
}

pub fn volume(cmd: &CommandText<'_>) -> Extraction {
    match first_integer_token(&cmd.lower) {
        Some(level) => Params::Level(level).into(),
        None => Extraction::clarify("Please specify volume level (0-100). Example: 'set volume 50'"),
    }
}

pub fn shutdown(cmd: &CommandText<'_>) -> Extraction {
    Params::Shutdown {
        cancel: has_word(&cmd.lower, "cancel"),
    }
    .into()
}

pub fn backspace(cmd: &CommandText<'_>) -> Extraction {
    Params::Count(first_integer_token(&cmd.lower).unwrap_or(1)).into()
}

pub fn youtube(cmd: &CommandText<'_>) -> Extraction {
    let text = cmd.lower.as_str();
    if text.contains("open youtube") || text == "youtube" {
        return Params::YouTube(YouTubeAction::Open).into();
    }
    if has_word(text, "play") {
        let query = remove_words(
            &remove_phrase(text, "on youtube"),
            &["youtube", "play", "video"],
        );
        if query.is_empty() {
            return Extraction::clarify("Please specify what to play on YouTube");
        }
        return Params::YouTube(YouTubeAction::Play(query)).into();
    }
    if has_word(text, "search") {
        let query = remove_words(
            &remove_phrase(text, "on youtube"),
            &["youtube", "search", "for"],
        );
        if query.is_empty() {
            return Extraction::clarify("Please specify what to search on YouTube");
        }
        return Params::YouTube(YouTubeAction::Search(query)).into();
    }
    Params::YouTube(YouTubeAction::Open).into()
}

pub fn play_video(cmd: &CommandText<'_>) -> Extraction {
    let query = remove_words(&remove_phrase(&cmd.lower, "on youtube"), &["play", "video"]);
    if query.is_empty() {
        Extraction::clarify("Please specify what to play")
    } else {
        Params::YouTube(YouTubeAction::Play(query)).into()
    }
}

pub fn open_app(cmd: &CommandText<'_>) -> Extraction {
    let name = remove_words(&cmd.lower, &["open"]);
    if name.is_empty() {
        Extraction::clarify("Please specify which application to open")
    } else {
        Params::Text(name).into()
    }
}

pub fn close_app(cmd: &CommandText<'_>) -> Extraction {
    let name = remove_words(&cmd.lower, &["close"]);
    if name.is_empty() {
        Extraction::clarify("Please specify which application to close")
    } else {
        Params::Text(name).into()
    }
}

pub fn web_search(cmd: &CommandText<'_>) -> Extraction {
    let query = remove_words(&cmd.lower, &["search", "google", "for"]);
    if query.is_empty() {
        Extraction::clarify("Please specify what to search for")
    } else {
        Params::Text(query).into()
    }
}

pub fn wikipedia(cmd: &CommandText<'_>) -> Extraction {
    let query = remove_words(&cmd.lower, &["wikipedia", "wiki", "search", "for"]);
    if query.is_empty() {
        Extraction::clarify("Please specify what to search on Wikipedia")
    } else {
        Params::Text(query).into()
    }
}

/// Normalize spoken operators into symbols: "what is 3 times 4?" -> "3 * 4".
pub fn arithmetic(cmd: &CommandText<'_>) -> Extraction {
    let expr = cmd
        .lower
        .replace("multiplied by", " * ")
        .replace("divided by", " / ")
        .replace("plus", " + ")
        .replace("minus", " - ")
        .replace("times", " * ")
        .replace("divided", " / ")
        .replace("what is", " ")
        .replace("what's", " ")
        .replace('?', " ");
    Params::Expression {
        expr: expr.split_whitespace().collect::<Vec<_>>().join(" "),
        original: cmd.raw.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(f: fn(&CommandText<'_>) -> Extraction, text: &str) -> Extraction {
        f(&CommandText::new(text))
    }

    #[test]
    fn first_integer_token_takes_leftmost_number() {
        assert_eq!(first_integer_token("set volume 1050"), Some(1050));
        assert_eq!(first_integer_token("press backspace 3 times"), Some(3));
        assert_eq!(first_integer_token("volume to 40%"), Some(40));
        assert_eq!(first_integer_token("volume up"), None);
        assert_eq!(first_integer_token("volume 99999999999999999999999"), Some(u64::MAX));
    }

    #[test]
    fn type_text_preserves_case() {
        assert_eq!(
            run(type_text, "Write Hello World"),
            Extraction::Params(Params::Text("Hello World".into()))
        );
        assert!(matches!(run(type_text, "type"), Extraction::ClarificationNeeded(_)));
    }

    #[test]
    fn messaging_contact_saying_body() {
        assert_eq!(
            run(messaging, "send message to Alice saying see you at 5"),
            Extraction::Params(Params::Message {
                target: MessageTarget::Contact("alice".into()),
                body: "see you at 5".into(),
            })
        );
    }

    #[test]
    fn messaging_to_raw_number() {
        assert_eq!(
            run(messaging, "send message to 9876543210 message running late"),
            Extraction::Params(Params::Message {
                target: MessageTarget::Number("9876543210".into()),
                body: "running late".into(),
            })
        );
    }

    #[test]
    fn messaging_file_keeps_keyword_bearing_filename() {
        assert_eq!(
            run(messaging, "send photo photo.jpg to bob"),
            Extraction::Params(Params::File {
                target: MessageTarget::Contact("bob".into()),
                path: "photo.jpg".into(),
            })
        );
    }

    #[test]
    fn messaging_without_delimiter_needs_clarification() {
        assert_eq!(
            run(messaging, "send a message saying hi"),
            Extraction::ClarificationNeeded(MESSAGING_USAGE.into())
        );
        assert!(matches!(
            run(messaging, "send file report.pdf"),
            Extraction::ClarificationNeeded(_)
        ));
    }

    #[test]
    fn weather_city_after_last_in() {
        assert_eq!(
            run(weather, "what's the weather in New York today?"),
            Extraction::Params(Params::City(Some("new york".into())))
        );
        assert_eq!(run(weather, "weather"), Extraction::Params(Params::City(None)));
    }

    #[test]
    fn youtube_variants() {
        assert_eq!(
            run(youtube, "open youtube"),
            Extraction::Params(Params::YouTube(YouTubeAction::Open))
        );
        assert_eq!(
            run(youtube, "play lofi beats on youtube"),
            Extraction::Params(Params::YouTube(YouTubeAction::Play("lofi beats".into())))
        );
        assert_eq!(
            run(youtube, "search youtube for rust talks"),
            Extraction::Params(Params::YouTube(YouTubeAction::Search("rust talks".into())))
        );
        assert!(matches!(run(youtube, "play youtube"), Extraction::ClarificationNeeded(_)));
    }

    #[test]
    fn arithmetic_normalizes_spoken_operators() {
        assert_eq!(
            run(arithmetic, "What is 6 multiplied by 7?"),
            Extraction::Params(Params::Expression {
                expr: "6 * 7".into(),
                original: "What is 6 multiplied by 7?".into(),
            })
        );
        assert!(matches!(
            run(arithmetic, "what is 2 + 2"),
            Extraction::Params(Params::Expression { expr, .. }) if expr == "2 + 2"
        ));
    }

    #[test]
    fn classify_target_requires_enough_digits() {
        assert_eq!(
            classify_target("+91 98765 43210"),
            MessageTarget::Number("+919876543210".into())
        );
        assert_eq!(classify_target("123"), MessageTarget::Contact("123".into()));
    }
}
