//! Step-up elevation: per-session state and the single-flight prompt coordinator

pub mod clock;
pub mod coordinator;
pub mod prompt;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{ElevationCoordinator, ElevationError, Resolution};
pub use prompt::{ChannelPrompt, LoggingPrompt, PromptCollaborator, PromptEvent, PromptRequest};
pub use state::{ElevationState, ElevationStateStore};
