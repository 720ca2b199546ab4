// Calendar domain models shared by the API server and the sync layer

pub mod discussion;
pub mod event;
pub mod user;

pub use discussion::{Discussion, Reply};
pub use event::{
    DeleteConfirmation, Engagement, Event, EventChanges, EventId, MembershipRequest, NewEvent,
};
pub use user::{initials, CurrentUser, UserIdentity};
