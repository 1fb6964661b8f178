pub mod admission;
pub mod calendar;
pub mod history;
pub mod lifecycle;
pub mod token;

pub use admission::AdmissionService;
pub use calendar::{CalendarService, SlotGrid};
pub use history::HistoryService;
pub use lifecycle::LifecycleService;
pub use token::{ScopeLocks, TokenSequencer};
