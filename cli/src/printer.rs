use std::env::{self, VarError};
use std::fmt::Display;
use std::io::{stderr, stdout, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Attribute, Color, ContentStyle, Print, PrintStyledContent, StyledContent};
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;

pub(crate) fn no_color_set() -> bool {
    !matches!(env::var("NO_COLOR"), Err(VarError::NotPresent))
}

#[cfg(feature = "unicode")]
pub mod marks {
    pub const OK: &str = "✔";
    pub const FAIL: &str = "✘";
}

#[cfg(not(feature = "unicode"))]
pub mod marks {
    pub const OK: &str = "ok";
    pub const FAIL: &str = "failed";
}

/// Prints results to stdout and a transient status line to stderr.
///
/// Styling and the status line only happen on a terminal and can be turned
/// off with `NO_COLOR`.
pub struct Printer {
    out_tty: bool,
    err_tty: bool,
    style_enabled: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            out_tty: stdout().is_tty(),
            err_tty: stderr().is_tty(),
            style_enabled: !no_color_set(),
        }
    }

    pub fn println(&self, content: impl Display) {
        self.println_styled(content, ContentStyle::default())
    }

    pub fn println_colored(&self, content: impl Display, color: Color) {
        let mut style = ContentStyle::default();
        style.foreground_color = Some(color);
        self.println_styled(content, style)
    }

    pub fn println_bold(&self, content: impl Display) {
        let mut style = ContentStyle::default();
        style.attributes.set(Attribute::Bold);
        self.println_styled(content, style)
    }

    pub fn println_styled(&self, content: impl Display, style: ContentStyle) {
        let styled = self.out_tty && self.style_enabled;
        let mut s = stdout().lock();
        if styled {
            _ = queue!(s, PrintStyledContent(StyledContent::new(style, content)));
        } else {
            _ = queue!(s, Print(content));
        }
        _ = queue!(s, Print("\n"));
        _ = s.flush();
    }

    /// An error line on stderr, red on a terminal
    pub fn eprintln_error(&self, content: impl Display) {
        self.clear_status();
        let mut s = stderr().lock();
        if self.err_tty && self.style_enabled {
            let mut style = ContentStyle::default();
            style.foreground_color = Some(Color::Red);
            _ = queue!(s, PrintStyledContent(StyledContent::new(style, content)));
        } else {
            _ = queue!(s, Print(content));
        }
        _ = queue!(s, Print("\n"));
        _ = s.flush();
    }

    /// Replace the status line, does nothing unless stderr is a terminal
    pub fn status(&self, content: impl Display) {
        if !self.err_tty {
            return;
        }
        let mut s = stderr().lock();
        _ = queue!(
            s,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(content)
        );
        _ = s.flush();
    }

    pub fn clear_status(&self) {
        if !self.err_tty {
            return;
        }
        let mut s = stderr().lock();
        _ = queue!(s, MoveToColumn(0), Clear(ClearType::CurrentLine));
        _ = s.flush();
    }
}
