//! Shared test doubles for stampgate
//!
//! - [`fixtures`] - Pre-built payloads and settings
//! - [`mock`] - Scripted and counting fakes for the token exchange, data
//!   fetchers and handshake collaborators
//!
//! ## Usage
//!
//! ```rust
//! use stampgate::testing::{fixtures::TestFixtures, mock::MockFetcher};
//!
//! let payload = TestFixtures::payload();
//! let fetcher = MockFetcher::record("DpoppDev", 150);
//! assert_eq!(payload.proofs.code, "code");
//! assert_eq!(fetcher.calls(), 0);
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;

/// Common test constants
pub mod constants {
    pub const TEST_SESSION_KEY: &str = "session-key";

    pub const TEST_CODE: &str = "code";

    /// Wallet address used by [`super::mock::MockSigner`] fixtures
    pub const TEST_ADDRESS: &str = "0xcafe";

    pub const TEST_ACCESS_TOKEN: &str = "mock-token";

    /// Unroutable API base for mocked clients
    pub const TEST_API_BASE: &str = "http://mock.invalid";
}
