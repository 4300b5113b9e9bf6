//! Testing utilities
//!
//! Fakes for every collaborator the coordinator depends on. Enabled for this
//! crate's unit tests and, through the `test-util` feature, for integration
//! tests. Never enable `test-util` in a release build.

mod mocks;

pub use mocks::{
    FixedDurations, MockClock, MockCredentialSink, MockKeyService, StoredCredentials,
};
