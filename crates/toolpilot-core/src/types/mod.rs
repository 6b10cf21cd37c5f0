mod id;
mod metadata;
mod timestamp;

pub use id::{Id, MessageId, RequestId, SessionId};
pub use metadata::Metadata;
pub use timestamp::Timestamp;
