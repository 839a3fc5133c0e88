pub mod event;
pub mod event_type;
pub mod payload;
pub mod state;

pub use event::*;
pub use event_type::*;
pub use payload::*;
pub use state::*;
