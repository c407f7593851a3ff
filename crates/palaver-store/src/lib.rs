//! User identity and persistence for Palaver.
//!
//! This crate owns the user model ([`User`], [`RoleKind`], [`UserId`]) and
//! the [`UserStore`] trait — the seam behind which credential and role
//! persistence lives. The chat core never talks to a database directly; it
//! calls the trait, and deployments plug in whatever backend they have.
//!
//! [`MemoryUserStore`] is the in-repo reference implementation, used by the
//! demo server and the test suites.

mod error;
mod memory;
mod model;
mod store;

pub use error::StoreError;
pub use memory::MemoryUserStore;
pub use model::{RoleKind, SharedUser, UnknownRole, User, UserId};
pub use store::UserStore;
