//! Plain-text rendering of feeds, categories and entries for the CLI.
//!
//! `DisplayVariant::Eink` drops ANSI emphasis and separator rules so output
//! suits low-refresh displays.
use std::borrow::Cow;
use std::io::{self, Write};

use crossterm::style::Stylize;

use crate::config::DisplayVariant;
use crate::storage::{Category, Entry};
use crate::sync::FetchOutcome;

const RULE_WIDTH: usize = 40;

pub struct Renderer {
    variant: DisplayVariant,
}

impl Renderer {
    pub fn new(variant: DisplayVariant) -> Self {
        Self { variant }
    }

    pub fn entry_list(&self, out: &mut impl Write, entries: &[Entry]) -> io::Result<()> {
        for entry in entries {
            writeln!(
                out,
                "{:>6}  {}",
                entry.id,
                self.emphasis(&strip_control_chars(&entry.title))
            )?;
            let date = entry.published_at.get(..10).unwrap_or(&entry.published_at);
            if date.is_empty() {
                writeln!(out, "        {}", strip_control_chars(&entry.url))?;
            } else {
                writeln!(out, "        {}  {}", date, strip_control_chars(&entry.url))?;
            }
        }
        Ok(())
    }

    pub fn category_list(&self, out: &mut impl Write, categories: &[Category]) -> io::Result<()> {
        for category in categories {
            writeln!(
                out,
                "{:>6}  {}",
                category.id,
                self.emphasis(&strip_control_chars(&category.title))
            )?;
        }
        Ok(())
    }

    pub fn entry_detail(&self, out: &mut impl Write, entry: &Entry) -> io::Result<()> {
        writeln!(out, "{}", self.emphasis(&strip_control_chars(&entry.title)))?;
        writeln!(out, "{}", strip_control_chars(&entry.url))?;
        if !entry.published_at.is_empty() {
            writeln!(out, "{}", strip_control_chars(&entry.published_at))?;
        }
        if self.variant == DisplayVariant::Standard {
            writeln!(out, "{}", "─".repeat(RULE_WIDTH))?;
        } else {
            writeln!(out)?;
        }
        writeln!(out, "{}", strip_control_chars(&entry.content))
    }

    /// One-line status for outcomes that carry no data to list.
    pub fn status<T>(&self, outcome: &FetchOutcome<T>, noun: &str) -> Option<String> {
        match outcome {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Empty => Some(format!("No {} found.", noun)),
            FetchOutcome::NotFetched => Some(format!("No {} loaded yet.", noun)),
            FetchOutcome::Failure(kind) => Some(format!("Could not load {}: {}.", noun, kind)),
        }
    }

    fn emphasis<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self.variant {
            DisplayVariant::Standard => Cow::Owned(text.bold().to_string()),
            DisplayVariant::Eink => Cow::Borrowed(text),
        }
    }
}

/// Remove terminal control characters and ANSI escape sequences from
/// server-supplied text. Tab, newline and carriage return are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_control = |c: char| {
        c == '\x1b' || c == '\x7f' || (c < ' ' && c != '\t' && c != '\n' && c != '\r')
    };
    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                // CSI: parameters until a final byte in 0x40..=0x7E
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ST (ESC \)
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
            continue;
        }
        if !is_control(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
