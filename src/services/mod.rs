//! Service layer built on the request executor.
//!
//! Each service wraps [`crate::ApiClient`] with typed endpoints.

pub mod messages;
pub mod users;

pub use messages::{MessageService, MessageServiceTrait};
pub use users::{UserService, UserServiceTrait};
