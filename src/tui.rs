//! Terminal setup for the diagram browser.
//!
//! Mouse capture is only turned on when clicks on node boxes are wanted;
//! with it off the terminal keeps its own text selection.

use std::io::{self, Stdout};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};

use crate::error::Result;

/// Size assumed when the terminal cannot report one.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Raw-mode alternate screen holding the diagram, table and overlays.
///
/// Dropping it restores the terminal, so an error that ends the event loop
/// early does not leave the shell in raw mode.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mouse_enabled: bool,
    active: bool,
}

impl Tui {
    /// Enter the alternate screen and raw mode. With `enable_mouse`, clicks
    /// and wheel scrolls reach the diagram as mouse events.
    pub fn new(enable_mouse: bool) -> Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen)?;
        if enable_mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        tracing::debug!(mouse = enable_mouse, "terminal initialized");
        Ok(Self {
            terminal,
            mouse_enabled: enable_mouse,
            active: true,
        })
    }

    /// Leave the alternate screen. Safe to call more than once.
    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        if self.mouse_enabled {
            execute!(self.terminal.backend_mut(), DisableMouseCapture)?;
        }
        terminal::disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!(error = %e, "terminal restore failed");
        }
    }
}

/// Where the diagram will be drawn before the first frame exists, so the
/// first layout is already centred for the real terminal.
pub fn initial_diagram_area() -> Rect {
    let (cols, rows) = terminal::size().unwrap_or(FALLBACK_SIZE);
    diagram_area_for(cols, rows)
}

/// Inner diagram area of a `cols` x `rows` screen: one border cell on each
/// side and the status bar row below.
fn diagram_area_for(cols: u16, rows: u16) -> Rect {
    Rect::new(1, 1, cols.saturating_sub(2), rows.saturating_sub(3))
}

/// Install a panic hook that restores the terminal before printing panic info.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture);
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        tracing::error!(%panic_info, "panic");
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagram_area_leaves_border_and_status_bar() {
        assert_eq!(diagram_area_for(120, 30), Rect::new(1, 1, 118, 27));
        assert_eq!(diagram_area_for(2, 1), Rect::new(1, 1, 0, 0));
    }

    #[test]
    fn fallback_size_gives_usable_area() {
        let (cols, rows) = FALLBACK_SIZE;
        let area = diagram_area_for(cols, rows);
        assert!(area.width > 0 && area.height > 0);
    }
}
