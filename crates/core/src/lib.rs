//! FixFlow Core - Domain types and request lifecycle rules.
//!
//! This crate provides everything the FixFlow components agree on:
//! - `server` - JSON API for clients, collaborators and the administrator
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision logic - no I/O, no
//! database access, no HTTP clients. Every rule that decides whether an actor
//! may move a service request forward lives here, so it can be tested without
//! a store and reused by any front end.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, price, roles and statuses
//! - [`model`] - Profiles, service requests, quotes, agenda items and messages
//! - [`lifecycle`] - The request state machine and its role-gated guards
//! - [`visibility`] - Who may read a request
//! - [`agenda`] - Quote validation and agenda derivation
//! - [`messaging`] - Request-scoped and direct message addressing
//! - [`dashboard`] - Role-specific read projections
//! - [`validation`] - Request intake validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod agenda;
pub mod dashboard;
pub mod lifecycle;
pub mod messaging;
pub mod model;
pub mod types;
pub mod validation;
pub mod visibility;

pub use lifecycle::{Action, Actor, Effect, Lifecycle, LifecycleError, Transition};
pub use model::*;
pub use types::*;
pub use validation::ValidationError;
