pub mod attacks;
pub mod dispatcher;
pub mod error;
pub mod frames;
pub mod identity;
pub mod link;
pub mod network;
pub mod orchestrator;
pub mod prober;
pub mod protocol;
pub mod sender;
pub mod session;
pub mod stop;

pub use error::AttackError;
pub use orchestrator::{Orchestrator, Outcome};
pub use stop::StopSignal;
