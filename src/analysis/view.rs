use super::prompt::Preset;
use super::typewriter::CURSOR;
use crate::{
    imaging::{NormalizedImage, Thumbnail},
    session::SessionSnapshot,
};
use colored::*;
use std::io::{self, Write};

/// The display surface the session and controller draw on.
pub trait AnalysisView: Send {
    fn image_loaded(&mut self, name: &str, image: &NormalizedImage, thumbnail: &Thumbnail);

    /// Header printed once a request passes its preconditions.
    fn question(&mut self, question: &str);

    fn status(&mut self, message: &str);

    /// Response so far, with the cursor marker appended.
    fn partial(&mut self, text: &str);

    /// Final response; replaces any partial view.
    fn complete(&mut self, text: &str);

    fn warning(&mut self, message: &str);

    fn error(&mut self, message: &str, hint: Option<&str>);

    fn render(&mut self, snapshot: &SessionSnapshot<'_>);
}

/// Writes to stdout. Partial updates only print the characters not yet shown,
/// with the cursor drawn and then backspaced over.
pub struct TerminalView {
    shown: usize,
    show_last_panel: bool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            shown: 0,
            show_last_panel: false,
        }
    }

    /// Expands the last-analysis panel on the next render.
    pub fn expand_last_analysis(&mut self) {
        self.show_last_panel = true;
    }

    fn end_partial_line(&mut self) {
        if self.shown > 0 {
            println!(" ");
            self.shown = 0;
        }
    }

    fn print_unshown(&mut self, text: &str) {
        let mut out = io::stdout();
        let fresh: String = text.chars().skip(self.shown).collect();
        self.shown += fresh.chars().count();
        let _ = write!(out, "{}", fresh);
        let _ = out.flush();
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisView for TerminalView {
    fn image_loaded(&mut self, name: &str, image: &NormalizedImage, thumbnail: &Thumbnail) {
        println!(
            "{} {} ({}x{} {}, sending {}x{} thumbnail)",
            "🖼️ ".normal(),
            name.bold(),
            image.width(),
            image.height(),
            image.format().as_str(),
            thumbnail.width(),
            thumbnail.height()
        );
    }

    fn question(&mut self, question: &str) {
        println!();
        println!("{}", "Analysis Question:".bold());
        println!("{}", question);
        println!("{}", "─".repeat(40).bright_black());
        println!("{}", "AI Professional Analysis:".bold());
    }

    fn status(&mut self, message: &str) {
        self.end_partial_line();
        println!("{}", message.bright_black().italic());
    }

    fn partial(&mut self, text: &str) {
        let body = text.strip_suffix(CURSOR).unwrap_or(text);
        self.print_unshown(body);
        let mut out = io::stdout();
        let _ = write!(out, "{}\x08", CURSOR);
        let _ = out.flush();
    }

    fn complete(&mut self, text: &str) {
        self.print_unshown(text);
        println!(" ");
        self.shown = 0;
    }

    fn warning(&mut self, message: &str) {
        self.end_partial_line();
        println!("{} {}", "⚠️ ".normal(), message.yellow());
    }

    fn error(&mut self, message: &str, hint: Option<&str>) {
        self.end_partial_line();
        println!("{} {}", "❌".normal(), message.red().bold());
        if let Some(hint) = hint {
            println!("{} {}", "💡".normal(), hint.cyan());
        }
    }

    fn render(&mut self, snapshot: &SessionSnapshot<'_>) {
        if !snapshot.has_credential {
            return;
        }
        if let Some(last) = snapshot.last_analysis.filter(|_| !snapshot.pending) {
            if self.show_last_panel {
                println!();
                println!("{}", "▼ Last analysis".bold());
                println!("{} {}", "Q:".bright_black(), last.question);
                println!("{}", last.result);
                self.show_last_panel = false;
            } else {
                println!(
                    "{}",
                    format!("▶ Last analysis: {} (/last to expand)", truncate(&last.question, 48))
                        .bright_black()
                );
            }
        }

        let presets = Preset::ALL
            .iter()
            .enumerate()
            .map(|(i, preset)| format!("[{}] {}", i + 1, preset.label()))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{} {}", "Quick Analysis Options:".bold(), presets);

        match snapshot.image_name {
            Some(name) => println!(
                "{} {}",
                "🔍 Start Analysis (/analyze) ready for".green(),
                name
            ),
            None => println!(
                "{}",
                "🔍 Start Analysis disabled: /upload <chart.png> first".bright_black()
            ),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}
