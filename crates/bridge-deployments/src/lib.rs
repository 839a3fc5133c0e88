pub mod deployment;
pub mod remediation;
pub mod service_state;
pub mod stage;

pub use deployment::*;
pub use remediation::*;
pub use service_state::*;
pub use stage::*;
