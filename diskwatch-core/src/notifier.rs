use std::fmt;

use async_trait::async_trait;

use crate::error::SinkError;

/// Markup mode the sink should apply to the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Plain,
}

impl ParseMode {
    /// Wire value for APIs that take a parse mode, `None` for plain text.
    pub fn as_api_str(self) -> Option<&'static str> {
        match self {
            ParseMode::Html => Some("HTML"),
            ParseMode::Plain => None,
        }
    }
}

/// Delivers formatted messages to a chat or channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        mode: ParseMode,
    ) -> Result<(), SinkError>;
}

/// A file that appeared in a monitored folder since the last cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewFileEvent<'a> {
    pub folder: &'a str,
    pub file_name: &'a str,
}

impl<'a> NewFileEvent<'a> {
    pub fn new(folder: &'a str, file_name: &'a str) -> Self {
        Self { folder, file_name }
    }

    /// HTML body announcing the file. Both names are escaped.
    pub fn to_html(&self) -> String {
        format!(
            "🔔 <b>New file added to Yandex.Disk!</b>\n\n\
             📄 <b>File:</b> <code>{}</code>\n\
             📂 <b>Folder:</b> <code>{}</code>",
            escape_html(self.file_name),
            escape_html(self.folder),
        )
    }
}

impl fmt::Display for NewFileEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.file_name, self.folder)
    }
}

/// Escape the three characters Telegram's HTML mode treats as markup.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
