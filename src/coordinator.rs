pub mod read;
pub mod write;

pub use read::{ChannelRead, ReadCoordinator, ReadOutcome, ReadReport, ReadRequest};
pub use write::{WriteCoordinator, WriteOutcome, WriteReport};
