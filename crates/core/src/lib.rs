//! `capgate-core` — shared building blocks for the authorization gate.
//!
//! Identifiers, the domain error model and the aggregate/event contracts live
//! here. Nothing in this crate performs IO.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{RoleId, UserId, WorkspaceId};
