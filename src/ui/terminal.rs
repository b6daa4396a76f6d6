// Terminal drawing for the chat view
//
// Final lines are printed permanently. Partial lines go on a status line that
// is cleared and redrawn whenever the next line arrives.

use std::io::{self, Write};

use super::renderer::{MessageList, RenderUpdate};
use super::view::{ClientView, Panel};

const CLEAR_LINE: &str = "\r\x1b[2K";

/// Draws message list updates to a terminal
///
/// There is one status line, so when several users have partial lines open
/// only the most recent is on screen. The `MessageList` still holds all of them.
pub struct TerminalRenderer<W: Write> {
    out: W,
    status_line_open: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            status_line_open: false,
        }
    }

    /// Draw the panel header for the current view
    pub fn draw_panel(&mut self, view: &ClientView) -> io::Result<()> {
        self.clear_status()?;
        match view.panel() {
            Panel::Login => writeln!(self.out, "Enter a username to join the chat:")?,
            Panel::Chat => writeln!(
                self.out,
                "Joined. Press Enter to {} (/stats, /quit).",
                view.record_label().to_lowercase()
            )?,
        }
        self.out.flush()
    }

    /// Show the record control's current label
    pub fn draw_label(&mut self, view: &ClientView) -> io::Result<()> {
        self.clear_status()?;
        writeln!(self.out, "[{}]", view.record_label())?;
        self.out.flush()
    }

    /// Draw the line added by the last `MessageList::apply`
    pub fn draw_update(&mut self, list: &MessageList, update: &RenderUpdate) -> io::Result<()> {
        let Some(line) = list.lines().get(update.appended_at) else {
            return Ok(());
        };

        self.clear_status()?;
        if line.is_partial() {
            write!(self.out, "{}", line)?;
            self.status_line_open = true;
        } else {
            writeln!(self.out, "{}", line)?;
            // Someone else may still be mid-sentence
            if let Some(pending) = list.lines().iter().rev().find(|l| l.is_partial()) {
                write!(self.out, "{}", pending)?;
                self.status_line_open = true;
            }
        }
        self.out.flush()
    }

    /// Print an informational line outside the message list
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        self.clear_status()?;
        writeln!(self.out, "{}", text)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn clear_status(&mut self) -> io::Result<()> {
        if self.status_line_open {
            write!(self.out, "{}", CLEAR_LINE)?;
            self.status_line_open = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChatMessage;

    fn draw(list: &mut MessageList, r: &mut TerminalRenderer<Vec<u8>>, msg: ChatMessage) {
        let update = list.apply(msg);
        r.draw_update(list, &update).unwrap();
    }

    #[test]
    fn test_partial_then_final_overwrites_status_line() {
        let mut list = MessageList::new();
        let mut renderer = TerminalRenderer::new(Vec::new());

        draw(&mut list, &mut renderer, ChatMessage::new("partial", "alice", "hel"));
        draw(&mut list, &mut renderer, ChatMessage::new("final", "alice", "hello"));

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, format!("alice: hel{}alice: hello\n", CLEAR_LINE));
    }

    #[test]
    fn test_final_lines_print_permanently() {
        let mut list = MessageList::new();
        let mut renderer = TerminalRenderer::new(Vec::new());

        draw(&mut list, &mut renderer, ChatMessage::new("final", "alice", "hi"));
        draw(&mut list, &mut renderer, ChatMessage::new("final", "bob", "yo"));

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "alice: hi\nbob: yo\n");
    }

    #[test]
    fn test_other_users_partial_survives_final() {
        let mut list = MessageList::new();
        let mut renderer = TerminalRenderer::new(Vec::new());

        draw(&mut list, &mut renderer, ChatMessage::new("partial", "alice", "hel"));
        draw(&mut list, &mut renderer, ChatMessage::new("final", "bob", "yo"));

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, format!("alice: hel{}bob: yo\nalice: hel", CLEAR_LINE));
    }
}
