pub mod events;
pub mod notification;
pub mod queue;

pub use events::*;
pub use notification::*;
pub use queue::*;
