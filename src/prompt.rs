use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// The user's answer to the relocation offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Accepted,
    Declined,
}

/// Everything a prompt implementation needs to phrase the offer.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub app_name: String,
    pub destination: PathBuf,
    /// Overrides the stock wording when set.
    pub custom_message: Option<String>,
}

impl PromptRequest {
    pub fn text(&self) -> String {
        if let Some(custom) = &self.custom_message {
            return custom.clone();
        }
        format!(
            "{} works best from the Applications folder. Move it to {}? \
             The original will be moved to the Trash.",
            self.app_name,
            self.destination.display()
        )
    }
}

/// Blocking confirmation, answered before any filesystem mutation happens.
///
/// The embedding application supplies its own implementation to present a
/// native dialog; [`ConsolePrompt`] covers terminal use.
pub trait ConfirmationPrompt {
    fn ask(&self, request: &PromptRequest) -> PromptChoice;
}

/// Reads a y/n answer from stdin. Anything but an explicit yes declines.
pub struct ConsolePrompt;

impl ConfirmationPrompt for ConsolePrompt {
    fn ask(&self, request: &PromptRequest) -> PromptChoice {
        print!("{} [y/N] ", request.text());
        if io::stdout().flush().is_err() {
            return PromptChoice::Declined;
        }

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return PromptChoice::Declined;
        }

        let answer = line.trim();
        if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
            PromptChoice::Accepted
        } else {
            PromptChoice::Declined
        }
    }
}
