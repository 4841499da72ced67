pub mod participant;
pub mod service;
pub mod task;
pub mod types;

pub use participant::Participant;
pub use service::{RelayService, RelaySettings};
pub use types::{RelayCommand, RelayError, RelayEvent, Sequenced};
