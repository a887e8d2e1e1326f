//! Ordered first-match intent table.
//!
//! Rules are evaluated strictly by ascending `order` on the lower-cased, trimmed text.
//! The first rule whose trigger holds wins; later, more specific rules are never consulted.
//! Short keywords are matched as whole words (tokens split on non-alphanumerics) so that
//! "times" does not fire the time rule and "display" does not fire the play rule.

use crate::extract::{self, CommandText};
use crate::intent::{Extraction, IntentId};

/// One keyword test against the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atom {
    /// Substring anywhere (multi-word phrases, operator symbols).
    Contains(&'static str),
    /// Whole token.
    Word(&'static str),
    /// Entire normalized text.
    Exact(&'static str),
}

impl Atom {
    fn holds(&self, text: &str, tokens: &[&str]) -> bool {
        match self {
            Atom::Contains(s) => text.contains(s),
            Atom::Word(w) => tokens.iter().any(|t| t == w),
            Atom::Exact(s) => text == *s,
        }
    }
}

pub fn word(w: &'static str) -> Atom {
    Atom::Word(w)
}

pub fn phrase(p: &'static str) -> Atom {
    Atom::Contains(p)
}

pub fn exact(s: &'static str) -> Atom {
    Atom::Exact(s)
}

/// Conjunction of any-of groups, minus a set of forbidden atoms.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    all_of: Vec<Vec<Atom>>,
    none_of: Vec<Atom>,
}

impl Trigger {
    pub fn any(atoms: &[Atom]) -> Self {
        Self {
            all_of: vec![atoms.to_vec()],
            none_of: Vec::new(),
        }
    }

    pub fn and_any(mut self, atoms: &[Atom]) -> Self {
        self.all_of.push(atoms.to_vec());
        self
    }

    pub fn unless(mut self, atoms: &[Atom]) -> Self {
        self.none_of.extend_from_slice(atoms);
        self
    }

    pub fn holds(&self, text: &str) -> bool {
        let tokens: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        !self.all_of.is_empty()
            && self
                .all_of
                .iter()
                .all(|group| group.iter().any(|a| a.holds(text, &tokens)))
            && !self.none_of.iter().any(|a| a.holds(text, &tokens))
    }
}

pub type Extractor = fn(&CommandText<'_>) -> Extraction;

pub struct IntentRule {
    pub order: u32,
    pub intent: IntentId,
    pub trigger: Trigger,
    pub extract: Extractor,
}

/// Outcome of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMatch {
    pub intent: IntentId,
    pub order: u32,
    pub extraction: Extraction,
}

/// Fixed, ordered rule table. Built once at startup; never mutated afterwards.
pub struct IntentMatcher {
    rules: Vec<IntentRule>,
}

impl IntentMatcher {
    /// Build from an arbitrary rule list. Rules are sorted by `order`; duplicate orders are rejected
    /// so that no two rules can ever be selected for one input.
    pub fn new(mut rules: Vec<IntentRule>) -> crate::CoreResult<Self> {
        rules.sort_by_key(|r| r.order);
        if let Some(pair) = rules.windows(2).find(|w| w[0].order == w[1].order) {
            return Err(crate::CoreError::Config(format!(
                "duplicate rule order {} ({} and {})",
                pair[0].order, pair[0].intent, pair[1].intent
            )));
        }
        Ok(Self { rules })
    }

    /// The assistant's standard table. Quit sits at order 0 so it short-circuits everything;
    /// typing and messaging come before the loose keyword rules they would otherwise collide with.
    ///
    /// Quit words match as whole words, not as substrings: "exit" and "bye" end the session,
    /// "exiting", "byebye" and "maybe" do not.
    pub fn standard() -> Self {
        let table: Vec<(IntentId, Trigger, Extractor)> = vec![
            (
                IntentId::Quit,
                Trigger::any(&[word("bye"), word("quit"), word("exit"), word("goodbye")]),
                extract::none,
            ),
            (
                IntentId::TypeText,
                Trigger::any(&[word("write"), word("type")])
                    .unless(&[phrase("rewrite"), phrase("overwrite")]),
                extract::type_text,
            ),
            (
                IntentId::Messaging,
                Trigger::any(&[word("send"), word("whatsapp")]).and_any(&[
                    word("message"),
                    word("saying"),
                    word("file"),
                    word("image"),
                    word("photo"),
                    word("document"),
                ]),
                extract::messaging,
            ),
            (
                IntentId::Greeting,
                Trigger::any(&[word("hello"), word("hi"), word("hey"), word("jarvis")]),
                extract::none,
            ),
            (IntentId::Time, Trigger::any(&[word("time")]), extract::none),
            (
                IntentId::Date,
                Trigger::any(&[word("date"), word("today")]),
                extract::none,
            ),
            (IntentId::Weather, Trigger::any(&[word("weather")]), extract::weather),
            (
                IntentId::Screenshot,
                Trigger::any(&[word("screenshot"), phrase("capture screen")]),
                extract::none,
            ),
            (
                IntentId::SystemInfo,
                Trigger::any(&[phrase("system info"), phrase("system status")]),
                extract::none,
            ),
            (IntentId::Volume, Trigger::any(&[word("volume")]), extract::volume),
            (
                IntentId::LockScreen,
                Trigger::any(&[word("lock")]).and_any(&[word("screen"), word("computer")]),
                extract::none,
            ),
            (
                IntentId::Sleep,
                Trigger::any(&[word("sleep")]).and_any(&[
                    word("system"),
                    word("computer"),
                    word("laptop"),
                ]),
                extract::none,
            ),
            (IntentId::Hibernate, Trigger::any(&[word("hibernate")]), extract::none),
            (
                IntentId::Shutdown,
                Trigger::any(&[
                    word("shutdown"),
                    phrase("shut down"),
                    phrase("power off"),
                    word("poweroff"),
                ]),
                extract::shutdown,
            ),
            (
                IntentId::Restart,
                Trigger::any(&[word("restart"), word("reboot")]),
                extract::none,
            ),
            (
                IntentId::NextTab,
                Trigger::any(&[phrase("next tab"), phrase("switch tab")]),
                extract::none,
            ),
            (
                IntentId::PreviousTab,
                Trigger::any(&[phrase("previous tab"), phrase("prev tab")]),
                extract::none,
            ),
            (IntentId::CloseTab, Trigger::any(&[phrase("close tab")]), extract::none),
            (
                IntentId::NewTab,
                Trigger::any(&[phrase("new tab"), phrase("open tab")]),
                extract::none,
            ),
            (
                IntentId::SwitchWindow,
                Trigger::any(&[phrase("switch window"), phrase("next window")]),
                extract::none,
            ),
            (IntentId::Minimize, Trigger::any(&[word("minimize")]), extract::none),
            (IntentId::Maximize, Trigger::any(&[word("maximize")]), extract::none),
            (IntentId::ShowDesktop, Trigger::any(&[word("desktop")]), extract::none),
            (
                IntentId::PressEnter,
                Trigger::any(&[phrase("press enter"), exact("enter")]),
                extract::none,
            ),
            (IntentId::Backspace, Trigger::any(&[word("backspace")]), extract::backspace),
            (IntentId::SelectAll, Trigger::any(&[phrase("select all")]), extract::none),
            (
                IntentId::Copy,
                Trigger::any(&[word("copy")]).unless(&[word("close")]),
                extract::none,
            ),
            (IntentId::Paste, Trigger::any(&[word("paste")]), extract::none),
            (IntentId::Cut, Trigger::any(&[word("cut")]), extract::none),
            (IntentId::Undo, Trigger::any(&[word("undo")]), extract::none),
            (IntentId::Redo, Trigger::any(&[word("redo")]), extract::none),
            (IntentId::YouTube, Trigger::any(&[word("youtube")]), extract::youtube),
            (
                IntentId::PlayVideo,
                Trigger::any(&[word("play")]).unless(&[word("open"), word("close")]),
                extract::play_video,
            ),
            (IntentId::OpenApp, Trigger::any(&[word("open")]), extract::open_app),
            (IntentId::CloseApp, Trigger::any(&[word("close")]), extract::close_app),
            (
                IntentId::WebSearch,
                Trigger::any(&[word("search"), word("google")]),
                extract::web_search,
            ),
            (
                IntentId::Wikipedia,
                Trigger::any(&[word("wikipedia"), word("wiki")]),
                extract::wikipedia,
            ),
            (
                IntentId::Arithmetic,
                Trigger::any(&[
                    phrase("+"),
                    phrase("-"),
                    phrase("*"),
                    phrase("/"),
                    word("plus"),
                    word("minus"),
                    word("times"),
                    word("divided"),
                    word("multiplied"),
                ]),
                extract::arithmetic,
            ),
            (
                IntentId::Help,
                Trigger::any(&[word("help"), phrase("what can you do")]),
                extract::none,
            ),
        ];

        let rules = table
            .into_iter()
            .enumerate()
            .map(|(order, (intent, trigger, extract))| IntentRule {
                order: order as u32,
                intent,
                trigger,
                extract,
            })
            .collect();
        Self { rules }
    }

    /// First matching rule, or `None` when nothing fires (caller routes to free-form).
    pub fn match_text(&self, text: &str) -> Option<IntentMatch> {
        let cmd = CommandText::new(text);
        self.rules
            .iter()
            .find(|rule| rule.trigger.holds(&cmd.lower))
            .map(|rule| IntentMatch {
                intent: rule.intent,
                order: rule.order,
                extraction: (rule.extract)(&cmd),
            })
    }

    /// Every rule whose trigger holds, in order. Diagnostic only; dispatch always uses the first.
    pub fn candidates(&self, text: &str) -> Vec<(u32, IntentId)> {
        let lower = text.trim().to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.trigger.holds(&lower))
            .map(|rule| (rule.order, rule.intent))
            .collect()
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::standard()
    }
}
