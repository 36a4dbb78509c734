//! What the subject sees and what the operator types.
//!
//! The session only talks to these traits. [`Terminal`] implements both on a
//! crossterm alternate screen.

mod layout;
mod terminal;

use anyhow::Result;

pub use layout::{centered_lines, PlacedLine};
pub use terminal::Terminal;

/// Text colour for the main display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    Original,
    Red,
    Green,
}

pub trait Presenter {
    /// Replace the main display with `text`. `label` names the screen in logs.
    fn display(&mut self, label: &str, text: &str) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    fn set_highlight(&mut self, highlight: Highlight) -> Result<()>;

    /// Show or hide the speaking-too-soon warning.
    fn too_soon_warning(&mut self, visible: bool) -> Result<()>;

    /// Persistent banner above the main display, e.g. during the microphone test.
    fn set_banner(&mut self, banner: Option<&str>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Return,
    Space,
}

impl Key {
    pub fn label(self) -> &'static str {
        match self {
            Key::Return => "RETURN",
            Key::Space => "SPACE",
        }
    }
}

/// Operator answer to "did you hear the recording?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicCheckChoice {
    Continue,
    Retry,
    Abort,
}

impl MicCheckChoice {
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'y' => Some(MicCheckChoice::Continue),
            'n' => Some(MicCheckChoice::Retry),
            'c' => Some(MicCheckChoice::Abort),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MicCheckChoice::Continue => "continue",
            MicCheckChoice::Retry => "retry",
            MicCheckChoice::Abort => "abort",
        }
    }
}

/// Operator input. Only presses made after a call begins count toward it.
pub trait Operator {
    /// Block until every key in `keys` has been pressed.
    fn wait_for_keys(&mut self, keys: &[Key]) -> Result<()>;

    /// Read one line of text, echoing it on the display.
    fn read_line(&mut self) -> Result<String>;

    fn mic_check_choice(&mut self) -> Result<MicCheckChoice>;
}

/// Everything the session needs from the console.
pub trait SessionUi: Presenter + Operator {}

impl<T: Presenter + Operator> SessionUi for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mic_check_keys_map_case_insensitively() {
        assert_eq!(MicCheckChoice::from_key('Y'), Some(MicCheckChoice::Continue));
        assert_eq!(MicCheckChoice::from_key('n'), Some(MicCheckChoice::Retry));
        assert_eq!(MicCheckChoice::from_key('c'), Some(MicCheckChoice::Abort));
        assert_eq!(MicCheckChoice::from_key('x'), None);
    }

    #[test]
    fn highlight_defaults_to_original() {
        assert_eq!(Highlight::default(), Highlight::Original);
    }
}
