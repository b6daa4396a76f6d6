use super::renderer::MessageList;

/// Label of the record control while idle
pub const START_LABEL: &str = "Start Recording";
/// Label of the record control while recording
pub const STOP_LABEL: &str = "Stop Recording";

/// Which top-level panel is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Login,
    Chat,
}

/// Client-side view state: panel visibility, the record control, and the message list
#[derive(Debug)]
pub struct ClientView {
    login_visible: bool,
    chat_visible: bool,
    record_label: &'static str,
    pub messages: MessageList,
}

impl ClientView {
    pub fn new() -> Self {
        Self {
            login_visible: true,
            chat_visible: false,
            record_label: START_LABEL,
            messages: MessageList::new(),
        }
    }

    /// Hide the login panel and show the chat panel
    pub fn show_chat(&mut self) {
        self.login_visible = false;
        self.chat_visible = true;
    }

    pub fn panel(&self) -> Panel {
        if self.chat_visible {
            Panel::Chat
        } else {
            Panel::Login
        }
    }

    pub fn login_visible(&self) -> bool {
        self.login_visible
    }

    pub fn chat_visible(&self) -> bool {
        self.chat_visible
    }

    pub fn record_label(&self) -> &'static str {
        self.record_label
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.record_label = if recording { STOP_LABEL } else { START_LABEL };
    }
}

impl Default for ClientView {
    fn default() -> Self {
        Self::new()
    }
}
