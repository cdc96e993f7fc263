//! # uniai
//!
//! Client side of the UniAI identity service: credential flows, session
//! lifecycle and the gating of protected views.
//!
//! ## Session
//!
//! The identity service hands out a compact three-segment token. The client
//! decodes the middle segment to read the claims but never verifies the
//! signature; validity is the server's call. The token and the identity derived
//! from it are persisted per tab in two slots and restored on start.
//!
//! ## Flows
//!
//! Sign-up, sign-in, forgot-password and OAuth completion are explicit state
//! machines ([`flow`]). Every request goes through the [`gateway`], which
//! attaches the bearer token and classifies each response by status *and* call
//! site: a 401 while signing in asks for a second factor, a 401 anywhere else
//! clears the session and redirects to the entry view.

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod flow;
pub mod gateway;
pub mod identity;
pub mod routes;
pub mod session;
pub mod token;

pub const GIT_COMMIT_HASH: &str = env!("UNIAI_GIT_SHA");
