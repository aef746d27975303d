//! Reminder scheduler — the polling loop that reconciles sheet events
//! against wall-clock time.
//!
//! Each cycle fetches the table, resolves every row to an instant, and
//! fires the rows whose instant falls inside the window since the last
//! evaluation. Windows partition the timeline, so a slow cycle widens
//! its window instead of skipping time. A fired set keyed on
//! (instant, description) keeps every occurrence at-most-once for the
//! process lifetime.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use chimeclaw_core::error::Result;
use chimeclaw_core::traits::Channel;
use chimeclaw_core::types::OutgoingMessage;

use crate::clock;
use crate::events::EventRow;
use crate::sheet::EventSource;

/// Width of the evaluation window on the first cycle after startup.
const STARTUP_WINDOW_SECS: i64 = 60;

pub struct ReminderScheduler {
    source: Arc<dyn EventSource>,
    channel: Arc<dyn Channel>,
    channel_id: String,
    tz: Tz,
    poll_interval_secs: u64,
    /// Exclusive start of the next evaluation window.
    window_start: Option<DateTime<Utc>>,
    fired: HashSet<(DateTime<Utc>, String)>,
}

impl ReminderScheduler {
    pub fn new(
        source: Arc<dyn EventSource>,
        channel: Arc<dyn Channel>,
        channel_id: impl Into<String>,
        tz: Tz,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            source,
            channel,
            channel_id: channel_id.into(),
            tz,
            poll_interval_secs,
            window_start: None,
            fired: HashSet::new(),
        }
    }

    /// Run the polling loop forever. Cycle errors are logged, never fatal.
    pub async fn run(mut self) {
        tracing::info!(
            "⏰ Reminder scheduler started (poll every {}s, tz {})",
            self.poll_interval_secs,
            self.tz
        );

        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.poll_interval_secs));

        loop {
            interval.tick().await;
            if let Err(e) = self.run_cycle().await {
                tracing::warn!("⚠️ Poll cycle skipped: {e}");
            }
        }
    }

    /// Run one poll cycle. A fetch failure leaves the window untouched,
    /// so the next successful cycle covers the skipped span.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let rows = self.source.fetch().await?;
        self.evaluate_at(&rows, Utc::now()).await;
        Ok(())
    }

    /// Evaluate one fetched table against the window ending at `now`.
    async fn evaluate_at(&mut self, rows: &[Vec<String>], now: DateTime<Utc>) {
        let window_start = self
            .window_start
            .unwrap_or_else(|| now - Duration::seconds(STARTUP_WINDOW_SECS));

        let due = self.due_events(rows, window_start, now);
        let mut all_delivered = true;

        for (instant, row) in due {
            let local = instant.with_timezone(&self.tz);
            let message = OutgoingMessage::text(&self.channel_id, row.reminder_text(&local));
            match self.channel.send(message).await {
                Ok(()) => {
                    tracing::info!("🔔 Reminder sent: '{}'", row.description);
                    self.fired.insert((instant, row.description));
                }
                Err(e) => {
                    all_delivered = false;
                    tracing::warn!("⚠️ Reminder delivery failed for '{}': {e}", row.description);
                }
            }
        }

        // A failed delivery keeps the window open so the next cycle
        // retries it; the fired set keeps successes at-most-once.
        self.window_start = Some(if all_delivered { now } else { window_start });
    }

    /// Decide which rows fire for the window `(window_start, now]`.
    /// Malformed rows are logged and skipped; they never abort a cycle.
    fn due_events(
        &self,
        rows: &[Vec<String>],
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<(DateTime<Utc>, EventRow)> {
        let mut due = Vec::new();

        for fields in rows.iter().skip(1) {
            let Some(row) = EventRow::from_fields(fields) else {
                tracing::warn!("⚠️ Skipping row with insufficient data: {fields:?}");
                continue;
            };

            let instant = match clock::resolve(&row.date, &row.time, self.tz) {
                Ok(dt) => dt.with_timezone(&Utc),
                Err(e) => {
                    tracing::warn!("⚠️ Skipping row '{}': {e}", row.description);
                    continue;
                }
            };

            let key = (instant, row.description.clone());
            if instant > window_start && instant <= now && !self.fired.contains(&key) {
                due.push((instant, row));
            }
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chimeclaw_core::error::ChimeClawError;
    use std::sync::Mutex;

    struct FakeSource {
        rows: Vec<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EventSource for FakeSource {
        async fn fetch(&self) -> Result<Vec<Vec<String>>> {
            if self.fail {
                return Err(ChimeClawError::Fetch("boom".into()));
            }
            Ok(self.rows.clone())
        }
    }

    #[derive(Default)]
    struct FakeChannel {
        sent: Mutex<Vec<OutgoingMessage>>,
        fail_sends: Mutex<usize>,
    }

    #[async_trait]
    impl Channel for FakeChannel {
        fn name(&self) -> &str {
            "fake"
        }
        async fn connect(&mut self) -> Result<()> {
            Ok(())
        }
        async fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        async fn send(&self, message: OutgoingMessage) -> Result<()> {
            let mut fail = self.fail_sends.lock().unwrap();
            if *fail > 0 {
                *fail -= 1;
                return Err(ChimeClawError::Delivery("down".into()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn sheet(rows: &[[&str; 4]]) -> Vec<Vec<String>> {
        let mut all = vec![vec![
            "Date".to_string(),
            "Time".to_string(),
            "Description".to_string(),
            "Link".to_string(),
        ]];
        for r in rows {
            all.push(r.iter().map(|s| s.to_string()).collect());
        }
        all
    }

    fn eastern(date: &str, time: &str) -> DateTime<Utc> {
        clock::resolve(date, time, chrono_tz::US::Eastern)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn scheduler(rows: Vec<Vec<String>>, channel: Arc<FakeChannel>) -> ReminderScheduler {
        ReminderScheduler::new(
            Arc::new(FakeSource { rows, fail: false }),
            channel,
            "111",
            chrono_tz::US::Eastern,
            60,
        )
    }

    #[tokio::test]
    async fn test_event_inside_window_fires() {
        let rows = sheet(&[["2025-03-01", "09:00", "Standup", "http://zoom.example/j/1"]]);
        let channel = Arc::new(FakeChannel::default());
        let mut sched = scheduler(rows.clone(), channel.clone());

        let now = eastern("2025-03-01", "09:00") + Duration::seconds(30);
        sched.evaluate_at(&rows, now).await;

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].thread_id, "111");
        assert!(sent[0].content.contains("Standup"));
        assert!(sent[0].content.contains("http://zoom.example/j/1"));
    }

    #[tokio::test]
    async fn test_event_outside_window_does_not_fire() {
        let rows = sheet(&[["2025-03-01", "09:00", "Standup", "http://x"]]);
        let channel = Arc::new(FakeChannel::default());
        let mut sched = scheduler(rows.clone(), channel.clone());

        // 90 seconds past: outside the startup window
        let now = eastern("2025-03-01", "09:00") + Duration::seconds(90);
        sched.evaluate_at(&rows, now).await;
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_future_event_waits() {
        let rows = sheet(&[["2025-03-01", "09:00", "Standup", "http://x"]]);
        let channel = Arc::new(FakeChannel::default());
        let mut sched = scheduler(rows.clone(), channel.clone());

        let now = eastern("2025-03-01", "09:00") - Duration::seconds(30);
        sched.evaluate_at(&rows, now).await;
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_duplicate_across_cycles() {
        let rows = sheet(&[["2025-03-01", "09:00", "Standup", "http://x"]]);
        let channel = Arc::new(FakeChannel::default());
        let mut sched = scheduler(rows.clone(), channel.clone());

        let now = eastern("2025-03-01", "09:00") + Duration::seconds(30);
        sched.evaluate_at(&rows, now).await;
        sched.evaluate_at(&rows, now + Duration::seconds(60)).await;
        sched.evaluate_at(&rows, now + Duration::seconds(120)).await;

        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_rows_skipped_rest_fire() {
        let mut rows = sheet(&[
            ["not-a-date", "09:00", "Broken", "http://x"],
            ["2025-03-01", "09:00", "Standup", "http://x"],
        ]);
        rows.insert(1, vec!["2025-03-01".to_string()]);

        let channel = Arc::new(FakeChannel::default());
        let mut sched = scheduler(rows.clone(), channel.clone());

        let now = eastern("2025-03-01", "09:00") + Duration::seconds(30);
        sched.evaluate_at(&rows, now).await;

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.contains("Standup"));
    }

    #[tokio::test]
    async fn test_slow_cycle_still_catches_event_once() {
        let rows = sheet(&[["2025-03-01", "09:02", "Standup", "http://x"]]);
        let channel = Arc::new(FakeChannel::default());
        let mut sched = scheduler(rows.clone(), channel.clone());

        let start = eastern("2025-03-01", "09:00");
        sched.evaluate_at(&rows, start).await;
        // Next evaluation arrives 3 minutes later; the event sits mid-gap
        sched.evaluate_at(&rows, start + Duration::seconds(180)).await;
        sched.evaluate_at(&rows, start + Duration::seconds(240)).await;

        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_retries_next_cycle() {
        let rows = sheet(&[["2025-03-01", "09:00", "Standup", "http://x"]]);
        let channel = Arc::new(FakeChannel::default());
        *channel.fail_sends.lock().unwrap() = 1;
        let mut sched = scheduler(rows.clone(), channel.clone());

        let now = eastern("2025-03-01", "09:00") + Duration::seconds(30);
        sched.evaluate_at(&rows, now).await;
        assert!(channel.sent.lock().unwrap().is_empty());

        // The window stayed open, so the next cycle retries
        sched.evaluate_at(&rows, now + Duration::seconds(60)).await;
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fired_set_blocks_resend_when_window_reopens() {
        let rows = sheet(&[
            ["2025-03-01", "09:00", "Standup", "http://x"],
            ["2025-03-01", "09:00", "Retro", "http://y"],
        ]);
        let channel = Arc::new(FakeChannel::default());
        *channel.fail_sends.lock().unwrap() = 1;
        let mut sched = scheduler(rows.clone(), channel.clone());

        let now = eastern("2025-03-01", "09:00") + Duration::seconds(30);
        // Standup's send fails, Retro's succeeds; window stays open
        sched.evaluate_at(&rows, now).await;
        sched.evaluate_at(&rows, now + Duration::seconds(60)).await;

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent.iter().filter(|m| m.content.contains("Retro")).count(),
            1
        );
        assert!(sent.iter().any(|m| m.content.contains("Standup")));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_window_untouched() {
        let channel = Arc::new(FakeChannel::default());
        let mut sched = ReminderScheduler::new(
            Arc::new(FakeSource {
                rows: vec![],
                fail: true,
            }),
            channel.clone(),
            "111",
            chrono_tz::US::Eastern,
            60,
        );

        let err = sched.run_cycle().await.unwrap_err();
        assert!(matches!(err, ChimeClawError::Fetch(_)));
        assert!(sched.window_start.is_none());
        assert!(channel.sent.lock().unwrap().is_empty());
    }
}
