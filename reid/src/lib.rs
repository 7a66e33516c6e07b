//! Stray-animal re-identification engine.
//!
//! Ingests photographs of sightings and registered profiles, derives a
//! biometric feature vector per record, and ranks other records whose
//! vectors are close enough to represent the same individual, subject to
//! human confirmation.
//!
//! The engine is request-driven and synchronous from the caller's point of
//! view: no background workers, no shared in-process state beyond the
//! persisted store. [`ReidService`] is the entry point; the pure pieces
//! ([`aggregate`], [`rank`]) and the store-backed pieces
//! ([`ProfileRegistry`], [`Matcher`]) are usable on their own.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod keys;
pub mod matcher;
pub mod page;
pub mod rank;
pub mod registry;
pub mod service;
pub mod types;

mod codec;

pub use config::Config;
pub use error::ReidError;
pub use matcher::Matcher;
pub use rank::{Scored, round4};
pub use registry::ProfileRegistry;
pub use service::{PhotoView, ReidService};
pub use types::{
    Biometrics, GeoPoint, MatchCandidate, MatchResult, MatchStatus, NewProfile, NewSighting,
    Page, PhotoAngle, PhotoMeta, Profile, ProfileAttrs, ProfileUpdate, Sex, Sighting,
    SightingEntry, SightingStatus, Species,
};
