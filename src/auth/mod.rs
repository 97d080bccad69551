//! Authentication primitives.
//!
//! - [`password`] -- Argon2id hashing and verification.
//! - [`jwt`] -- access/refresh token issue and validation.
//! - [`extractor`] -- resolving the calling user from a Bearer token.

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::{Caller, OptionalCaller};
