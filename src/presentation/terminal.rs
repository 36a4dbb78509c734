use super::layout::centered_lines;
use super::{Highlight, Key, MicCheckChoice, Operator, Presenter};
use crate::{log_debug, log_debug_content};
use crate::terminal_restore::TerminalRestoreGuard;
use anyhow::{bail, Result};
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use std::collections::HashSet;
use std::io::{self, Stdout, Write};
use std::time::Duration;

const TOO_SOON_WARNING: &str = "Too soon! Wait until the word has left the screen.";

/// Everything currently drawn; each change redraws the whole screen.
#[derive(Debug, Default)]
struct View {
    text: Option<String>,
    highlight: Highlight,
    too_soon: bool,
    banner: Option<String>,
    input: Option<String>,
}

/// Where key events come from. `pending` must not block.
pub(crate) trait EventSource {
    fn pending(&mut self) -> io::Result<bool>;
    fn read(&mut self) -> io::Result<Event>;
}

struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn pending(&mut self) -> io::Result<bool> {
        event::poll(Duration::ZERO)
    }

    fn read(&mut self) -> io::Result<Event> {
        event::read()
    }
}

/// Drop input typed before a prompt was shown. Returns how many events went.
pub(crate) fn discard_pending(source: &mut impl EventSource) -> io::Result<usize> {
    let mut discarded = 0;
    while source.pending()? {
        source.read()?;
        discarded += 1;
    }
    Ok(discarded)
}

/// Next key press. Ctrl+C ends the session.
pub(crate) fn next_key(
    source: &mut impl EventSource,
    mut on_resize: impl FnMut() -> Result<()>,
) -> Result<KeyEvent> {
    loop {
        match source.read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    bail!("interrupted by operator");
                }
                return Ok(key);
            }
            Event::Resize(_, _) => on_resize()?,
            _ => {}
        }
    }
}

/// Full-screen crossterm console for subject display and operator input.
/// Every prompt ignores keys pressed before it appeared.
pub struct Terminal {
    out: Stdout,
    view: View,
    events: CrosstermEvents,
    _guard: TerminalRestoreGuard,
}

impl Terminal {
    pub fn open() -> Result<Self> {
        let guard = TerminalRestoreGuard::new();
        let mut out = io::stdout();
        guard.enable_raw_mode()?;
        guard.enter_alt_screen(&mut out)?;
        let mut terminal = Self {
            out,
            view: View::default(),
            events: CrosstermEvents,
            _guard: guard,
        };
        terminal.render()?;
        Ok(terminal)
    }

    fn render(&mut self) -> Result<()> {
        render(&mut self.out, &self.view)
    }

    fn next_key(&mut self) -> Result<KeyEvent> {
        let Self { out, view, events, .. } = self;
        next_key(events, || render(out, view))
    }

    fn discard_pending(&mut self) -> Result<()> {
        let discarded = discard_pending(&mut self.events)?;
        if discarded > 0 {
            log_debug(&format!("discarded {discarded} buffered input events"));
        }
        Ok(())
    }
}

fn render(out: &mut Stdout, view: &View) -> Result<()> {
    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    queue!(out, Clear(ClearType::All))?;

    if let Some(banner) = &view.banner {
        for line in centered_lines(banner, cols, 1) {
            queue!(
                out,
                MoveTo(line.col, 0),
                SetAttribute(Attribute::Bold),
                Print(line.text),
                SetAttribute(Attribute::Reset)
            )?;
        }
    }

    let body = view.input.as_ref().or(view.text.as_ref());
    if let Some(body) = body {
        let color = match view.highlight {
            Highlight::Original => Color::Reset,
            Highlight::Red => Color::Red,
            Highlight::Green => Color::Green,
        };
        for line in centered_lines(body, cols, rows.saturating_sub(2)) {
            queue!(
                out,
                MoveTo(line.col, line.row + 1),
                SetForegroundColor(color),
                Print(line.text),
                ResetColor
            )?;
        }
    }

    if view.too_soon {
        for line in centered_lines(TOO_SOON_WARNING, cols, 1) {
            queue!(
                out,
                MoveTo(line.col, rows.saturating_sub(1)),
                SetForegroundColor(Color::Yellow),
                Print(line.text),
                ResetColor
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

/// First key that maps to a microphone-check answer; other keys are ignored.
pub(crate) fn next_choice(
    source: &mut impl EventSource,
    mut on_resize: impl FnMut() -> Result<()>,
) -> Result<MicCheckChoice> {
    loop {
        if let KeyCode::Char(ch) = next_key(source, &mut on_resize)?.code {
            if let Some(choice) = MicCheckChoice::from_key(ch) {
                return Ok(choice);
            }
        }
    }
}

fn matches_key(code: KeyCode, key: Key) -> bool {
    match key {
        Key::Return => code == KeyCode::Enter,
        Key::Space => code == KeyCode::Char(' '),
    }
}

impl Presenter for Terminal {
    fn display(&mut self, label: &str, text: &str) -> Result<()> {
        log_debug_content(&format!("display[{label}]: {text}"));
        self.view.text = Some(text.to_string());
        self.render()
    }

    fn clear(&mut self) -> Result<()> {
        self.view.text = None;
        self.render()
    }

    fn set_highlight(&mut self, highlight: Highlight) -> Result<()> {
        self.view.highlight = highlight;
        self.render()
    }

    fn too_soon_warning(&mut self, visible: bool) -> Result<()> {
        if self.view.too_soon == visible {
            return Ok(());
        }
        self.view.too_soon = visible;
        self.render()
    }

    fn set_banner(&mut self, banner: Option<&str>) -> Result<()> {
        self.view.banner = banner.map(str::to_string);
        self.render()
    }
}

impl Operator for Terminal {
    fn wait_for_keys(&mut self, keys: &[Key]) -> Result<()> {
        self.discard_pending()?;
        let mut pressed = HashSet::new();
        while pressed.len() < keys.len() {
            let event = self.next_key()?;
            for (idx, key) in keys.iter().enumerate() {
                if matches_key(event.code, *key) {
                    pressed.insert(idx);
                }
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        self.discard_pending()?;
        let mut line = String::new();
        self.view.input = Some(String::new());
        self.render()?;
        loop {
            let event = self.next_key()?;
            match event.code {
                KeyCode::Enter => break,
                KeyCode::Backspace => {
                    line.pop();
                }
                KeyCode::Char(ch) => line.push(ch),
                _ => continue,
            }
            self.view.input = Some(line.clone());
            self.render()?;
        }
        self.view.input = None;
        self.render()?;
        Ok(line)
    }

    fn mic_check_choice(&mut self) -> Result<MicCheckChoice> {
        self.discard_pending()?;
        let Self { out, view, events, .. } = self;
        next_choice(events, || render(out, view))
    }
}
