//! Event rows from the remote sheet.

use chrono::DateTime;
use chrono_tz::Tz;

/// One scheduled event, built from a raw sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// Raw date field, `YYYY-MM-DD`.
    pub date: String,
    /// Raw time field, `HH:MM` (24-hour).
    pub time: String,
    pub description: String,
    /// Meeting link, when the row carries one.
    pub link: Option<String>,
}

impl EventRow {
    /// Build from a raw row. Needs at least date, time, description, and
    /// link columns; extra columns are ignored, an empty link maps to None.
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        if fields.len() < 4 {
            return None;
        }
        let link = fields[3].trim();
        Some(Self {
            date: fields[0].trim().to_string(),
            time: fields[1].trim().to_string(),
            description: fields[2].trim().to_string(),
            link: if link.is_empty() {
                None
            } else {
                Some(link.to_string())
            },
        })
    }

    /// Reminder message posted when the event fires.
    pub fn reminder_text(&self, when: &DateTime<Tz>) -> String {
        let mut text = format!(
            "🔔 **Event Reminder** 🔔\n\n**{}**\n\n📅 Date & Time: {}",
            self.description,
            when.format("%Y-%m-%d %H:%M %p")
        );
        if let Some(link) = &self.link {
            text.push_str(&format!("\n\n🔗 [Zoom link]({link})"));
        }
        text
    }

    /// One line in the daily summary.
    pub fn summary_line(&self) -> String {
        format!("- 📝 {} at 🕒 {}", self.description, self.time)
    }
}
