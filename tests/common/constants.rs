//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, secrets, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user name
pub const TEST_USER: &str = "testuser";

/// Regular test user email
pub const TEST_EMAIL: &str = "testuser@example.com";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Second user, owns nothing the first user can see
pub const OTHER_USER: &str = "otheruser";

/// Second user email
pub const OTHER_EMAIL: &str = "otheruser@example.com";

/// Second user password
pub const OTHER_PASS: &str = "otherpass123";

/// Secret the test server signs tokens with
pub const TEST_JWT_SECRET: &str = "e2e-test-secret";

// ============================================================================
// Test Library Data
// ============================================================================

/// Duration of every version uploaded by the tests (seconds)
pub const TEST_DURATION_SECS: f64 = 180.0;

/// Audio file reference used for uploaded versions
pub const TEST_FILE_URL: &str = "https://cdn.example.com/audio/demo.mp3";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
