//! Wire formats and the dashboard's data model

mod envelope;
mod event;
mod field;
mod loops;
mod persona;
mod snapshot;
mod timeline;

pub use envelope::{Envelope, EnvelopeError};
pub use event::StreamEvent;
pub use field::Field;
pub use loops::{LoopName, LoopStatus};
pub use persona::{PersonaCatalog, PersonaPatch, PersonaState, PersonaSummary, PromptUpdate};
pub use snapshot::StateSnapshot;
pub use timeline::{Timeline, TimelineEvent, TIMELINE_CAPACITY};
