pub mod fifo;
pub mod set;
pub mod spec;

pub use set::{Channel, ChannelSet, ChannelState};
pub use spec::{ChannelKind, ChannelSpec, Direction, RunArtifacts, RunIdentity};
