//! # ChimeClaw Scheduler
//!
//! Event reminder and daily digest loops over a remote event sheet.
//!
//! ## Architecture
//! ```text
//! SheetSource (published CSV)
//!   └── raw rows → clock (tz resolve) → ReminderScheduler
//!                                         └── due events → Channel (Discord)
//!
//! DigestScheduler (daily at HH:00 local)
//!   ├── today's events summary ← SheetSource
//!   └── generated tech post    ← Provider (Gemini)
//! ```

pub mod clock;
pub mod digest;
pub mod events;
pub mod reminder;
pub mod sheet;

pub use digest::DigestScheduler;
pub use events::EventRow;
pub use reminder::ReminderScheduler;
pub use sheet::{EventSource, SheetSource};
