//! Client for the DESY DOOR user portal REST API.

pub mod api;
pub mod auth;
pub mod client;
pub mod filter;
pub mod models;

pub use api::DoorApi;
pub use auth::{DoorAuthClient, LoginFailure, LoginOutcome};
pub use client::{DoorClient, DoorHeaders, DoorTransport, HttpTransport};
pub use filter::SessionFilter;
pub use models::{split_multiple_by_comma, Institute, Proposal, Role, Session, User};
