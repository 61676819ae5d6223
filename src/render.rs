//! # Terminal rendering
//!
//! Draws the chat transcript as role-tagged bubbles, plus the status line,
//! warnings and errors. Assistant text gets light markdown treatment:
//!
//! - headers (`#`, `##`, `###`) in bold cyan
//! - inline code in yellow, `**bold**` in bold
//! - fenced code blocks highlighted with Syntect (`base16-ocean.dark`)
//!
//! Every function writes to any [`Write`] so the output can be captured in
//! tests; the binary passes `stdout()`.

use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::io::Write;
use std::time::Duration;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

use crate::{
    error::ChatError,
    history::{Role, Turn},
    session::ChatSession,
};

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(\w+)?\n([\s\S]*?)```").expect("valid regex"));
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^\*]+)\*\*").expect("valid regex"));

fn role_style(role: Role) -> (&'static str, Color) {
    match role {
        Role::User => ("you", Color::Green),
        Role::Assistant => ("assistant", Color::Blue),
        Role::System => ("system", Color::DarkGrey),
    }
}

/// Print one bubble: a colored role tag followed by the content.
pub fn print_turn<W: Write>(out: &mut W, turn: &Turn) -> Result<(), Box<dyn Error>> {
    let (label, color) = role_style(turn.role);

    out.execute(SetForegroundColor(color))?;
    out.execute(SetAttribute(Attribute::Bold))?;
    writeln!(out, "{label}:")?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::Reset))?;

    match turn.role {
        Role::Assistant => print_markdown(out, &turn.content)?,
        _ => writeln!(out, "{}", turn.content)?,
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Print every turn in order.
pub fn print_transcript<W: Write>(out: &mut W, turns: &[Turn]) -> Result<(), Box<dyn Error>> {
    for turn in turns {
        print_turn(out, turn)?;
    }
    Ok(())
}

/// Model, temperature and the conversation id (for support/debugging).
pub fn print_status<W: Write>(out: &mut W, session: &ChatSession) -> Result<(), Box<dyn Error>> {
    out.execute(SetForegroundColor(Color::DarkGrey))?;
    writeln!(
        out,
        "model: {} | temperature: {:.1} | conversation_id: {}",
        session.settings.model(),
        session.settings.temperature(),
        session.conversation_id()
    )?;
    out.execute(SetForegroundColor(Color::Reset))?;
    Ok(())
}

/// Non-blocking problem, e.g. a failed write to the message log.
pub fn print_warning<W: Write>(out: &mut W, warning: &ChatError) -> Result<(), Box<dyn Error>> {
    out.execute(SetForegroundColor(Color::Yellow))?;
    writeln!(out, "warning: {warning}")?;
    out.execute(SetForegroundColor(Color::Reset))?;
    Ok(())
}

/// Blocking error for the current turn.
pub fn print_error<W: Write>(out: &mut W, err: &ChatError) -> Result<(), Box<dyn Error>> {
    out.execute(SetForegroundColor(Color::Red))?;
    out.execute(SetAttribute(Attribute::Bold))?;
    writeln!(out, "error: {err}")?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::Reset))?;
    Ok(())
}

/// Spinner shown while the completion call is outstanding.
pub fn waiting_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Waiting for the answer...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Render markdown-ish text, highlighting fenced code blocks.
pub fn print_markdown<W: Write>(out: &mut W, text: &str) -> Result<(), Box<dyn Error>> {
    let theme = &THEMES.themes["base16-ocean.dark"];
    let mut last_end = 0;

    for cap in CODE_BLOCK_RE.captures_iter(text) {
        let Some(whole) = cap.get(0) else { continue };

        if whole.start() > last_end {
            print_lines(out, &text[last_end..whole.start()])?;
        }

        let language = cap.get(1).map(|m| m.as_str()).unwrap_or("text");
        let code = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        print_code_block(out, code, language, theme)?;

        last_end = whole.end();
    }

    if last_end < text.len() {
        print_lines(out, &text[last_end..])?;
    }

    Ok(())
}

fn print_lines<W: Write>(out: &mut W, text: &str) -> Result<(), Box<dyn Error>> {
    for line in text.lines() {
        let header = line
            .strip_prefix("### ")
            .or_else(|| line.strip_prefix("## "))
            .or_else(|| line.strip_prefix("# "));

        if let Some(header) = header {
            out.execute(SetForegroundColor(Color::Cyan))?;
            out.execute(SetAttribute(Attribute::Bold))?;
            writeln!(out, "{header}")?;
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(SetForegroundColor(Color::Reset))?;
        } else {
            let line = INLINE_CODE_RE.replace_all(line, "\x1b[33m$1\x1b[0m");
            let line = BOLD_RE.replace_all(&line, "\x1b[1m$1\x1b[0m");
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn print_code_block<W: Write>(
    out: &mut W,
    code: &str,
    language: &str,
    theme: &Theme,
) -> Result<(), Box<dyn Error>> {
    out.execute(SetForegroundColor(Color::DarkGrey))?;
    out.execute(SetAttribute(Attribute::Italic))?;
    writeln!(out, "[{language}]")?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::Reset))?;

    let syntaxes = &*SYNTAXES;
    let syntax = syntaxes
        .find_syntax_by_token(language)
        .or_else(|| syntaxes.find_syntax_by_extension(language))
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text());

    let mut highlighter = HighlightLines::new(syntax, theme);
    for line in LinesWithEndings::from(code) {
        let ranges: Vec<(Style, &str)> = highlighter.highlight_line(line, syntaxes)?;
        write!(out, "{}", as_24_bit_terminal_escaped(&ranges[..], false))?;
        out.execute(SetAttribute(Attribute::Reset))?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrostConfig;

    fn rendered<F>(draw: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), Box<dyn Error>>,
    {
        let mut buffer = Vec::new();
        draw(&mut buffer).expect("render");
        String::from_utf8(buffer).expect("utf-8 output")
    }

    #[test]
    fn test_turns_are_tagged_with_their_role() {
        let output = rendered(|out| {
            print_transcript(out, &[Turn::user("Bonjour"), Turn::assistant("Salut !")])
        });

        let user_at = output.find("you:").unwrap();
        let assistant_at = output.find("assistant:").unwrap();
        assert!(user_at < assistant_at);
        assert!(output.contains("Bonjour"));
        assert!(output.contains("Salut !"));
    }

    #[test]
    fn test_status_shows_conversation_id() {
        let session = ChatSession::from_config(&FrostConfig::default()).unwrap();
        let output = rendered(|out| print_status(out, &session));

        assert!(output.contains(session.conversation_id()));
        assert!(output.contains("mistral-large"));
        assert!(output.contains("0.2"));
    }

    #[test]
    fn test_code_block_is_labelled_and_kept() {
        let output = rendered(|out| {
            print_markdown(out, "# Title\nUse `cargo`:\n```rust\nfn main() {}\n```\ndone")
        });

        assert!(output.contains("Title"));
        assert!(!output.contains("# Title"));
        assert!(output.contains("[rust]"));
        assert!(output.contains("main"));
        assert!(output.contains("done"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_warnings_and_errors_carry_the_message() {
        let output = rendered(|out| {
            print_warning(out, &ChatError::PersistenceFailure("locked".into()))?;
            print_error(out, &ChatError::EmptyCompletion)
        });

        assert!(output.contains("warning: could not save message: locked"));
        assert!(output.contains("error: empty response"));
    }
}
