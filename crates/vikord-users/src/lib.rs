//! `vikord-users`: Vikunja ⇄ Discord identity mappings.
//!
//! [`identity::IdentityStore`] owns the `user_mappings` table;
//! [`resolver::IdentityResolver`] turns a set of Vikunja user ids into
//! Discord ids in one query per notification.

pub mod db;
pub mod error;
pub mod identity;
pub mod resolver;
pub mod types;

pub use error::{Result, UserError};
pub use identity::IdentityStore;
pub use resolver::IdentityResolver;
pub use types::UserMapping;
