//! Daily digest scheduler — once a day, posts a summary of today's
//! events plus a generated tech post.

use std::sync::Arc;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use chimeclaw_core::error::Result;
use chimeclaw_core::traits::{Channel, Provider};
use chimeclaw_core::types::OutgoingMessage;

use crate::events::EventRow;
use crate::sheet::EventSource;

/// Prompt for the generated digest post.
pub const DIGEST_PROMPT: &str = "\
Create a Discord-friendly post about an esoteric or niche technology. \
Make sure to vary the format and structure each time you use this prompt. \
Include the following elements:

Engaging Title: Choose a creative title that draws attention.
Brief Overview: Describe what the technology is, its origin, and its key features in a concise manner.
Interesting Aspects: Highlight what makes this technology fascinating or valuable, especially in educational contexts.
Commands or Features: Present a list or table of essential commands, features, or characteristics that define the technology.
Famous Example: Provide an example of how the technology is used, perhaps with a notable program or application.
Final Thoughts: Conclude with a thought-provoking statement about the relevance or implications of this technology in understanding broader programming concepts.
Link for More Information: Add a reliable source link for readers who want to explore further.";

pub struct DigestScheduler {
    source: Arc<dyn EventSource>,
    channel: Arc<dyn Channel>,
    provider: Arc<dyn Provider>,
    channel_id: String,
    tz: Tz,
    hour: u32,
}

impl DigestScheduler {
    pub fn new(
        source: Arc<dyn EventSource>,
        channel: Arc<dyn Channel>,
        provider: Arc<dyn Provider>,
        channel_id: impl Into<String>,
        tz: Tz,
        hour: u32,
    ) -> Self {
        Self {
            source,
            channel,
            provider,
            channel_id: channel_id.into(),
            tz,
            hour,
        }
    }

    /// Run the daily loop forever.
    pub async fn run(self) {
        tracing::info!(
            "📅 Digest scheduler started (daily at {:02}:00 {})",
            self.hour,
            self.tz
        );

        loop {
            let now = Utc::now();
            let target = next_fire_after(now, self.hour, self.tz);
            tracing::debug!("Next digest at {}", target.with_timezone(&self.tz));

            let wait = (target - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            self.fire().await;
        }
    }

    /// Post today's event summary, then the generated post. Each half
    /// fails independently; nothing retries before the next day.
    pub async fn fire(&self) {
        match self.todays_summary().await {
            Ok(Some(summary)) => {
                let msg = OutgoingMessage::text(&self.channel_id, summary);
                match self.channel.send(msg).await {
                    Ok(()) => tracing::info!("📅 Daily summary posted"),
                    Err(e) => tracing::warn!("⚠️ Summary delivery failed: {e}"),
                }
            }
            Ok(None) => tracing::info!("No events today, skipping summary"),
            Err(e) => tracing::warn!("⚠️ Summary skipped: {e}"),
        }

        match self.provider.generate(DIGEST_PROMPT).await {
            Ok(text) => {
                let msg = OutgoingMessage::text(&self.channel_id, text);
                match self.channel.send(msg).await {
                    Ok(()) => tracing::info!("📣 Digest posted"),
                    Err(e) => tracing::warn!("⚠️ Digest delivery failed: {e}"),
                }
            }
            Err(e) => tracing::warn!("⚠️ Digest generation failed: {e}"),
        }
    }

    /// Build the "today's events" summary, None when today has none.
    async fn todays_summary(&self) -> Result<Option<String>> {
        let rows = self.source.fetch().await?;
        let today = Utc::now().with_timezone(&self.tz).date_naive();
        Ok(summarize_day(&rows, today))
    }
}

/// Next digest instant strictly after `now`: today at `hour`:00 local,
/// or tomorrow when that has already passed. A nonexistent local target
/// (DST gap) shifts one hour forward; an ambiguous one takes the
/// earlier offset.
pub fn next_fire_after(now: DateTime<Utc>, hour: u32, tz: Tz) -> DateTime<Utc> {
    let mut date = now.with_timezone(&tz).date_naive();

    loop {
        if let Some(naive) = date.and_hms_opt(hour, 0, 0) {
            let candidate = match tz.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Some(dt),
                LocalResult::Ambiguous(earlier, _) => Some(earlier),
                LocalResult::None => date
                    .and_hms_opt(hour + 1, 0, 0)
                    .and_then(|n| tz.from_local_datetime(&n).earliest()),
            };
            if let Some(dt) = candidate {
                let utc = dt.with_timezone(&Utc);
                if utc > now {
                    return utc;
                }
            }
        }
        date += Duration::days(1);
    }
}

/// List the events whose date equals `day`, in sheet order.
pub fn summarize_day(rows: &[Vec<String>], day: NaiveDate) -> Option<String> {
    let mut lines = Vec::new();

    for fields in rows.iter().skip(1) {
        let Some(row) = EventRow::from_fields(fields) else {
            continue;
        };
        match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(date) if date == day => lines.push(row.summary_line()),
            _ => {}
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(format!(
            "📅 **Today's Upcoming Events**:\n{}",
            lines.join("\n")
        ))
    }
}
