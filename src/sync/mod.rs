// Client-side sync - event and discussion stores kept in step with the REST API

pub mod baseline;
pub mod command;
pub mod error;
pub mod merge;
pub mod remote;
pub mod store;
pub mod sync_layer;

pub use baseline::baseline_events;
pub use command::Command;
pub use error::{RemoteError, SyncError, SyncResult};
pub use merge::merge_events;
pub use remote::{HttpRemote, RemoteApi, RemoteResult};
pub use store::{CalendarState, DiscussionStore, EventStore};
pub use sync_layer::SyncLayer;
