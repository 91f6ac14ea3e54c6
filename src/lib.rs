//! Outfield - push GitHub Actions secrets and variables to many repositories at once.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── mod           # Flag parsing and run orchestration
//! │   └── output        # Terminal output helpers
//! ├── core/             # Core library components
//! │   ├── config        # outfield.toml loading and validation
//! │   ├── sealed_box    # libsodium-compatible sealed box encryption
//! │   └── dispatch      # Concurrent per-repository batch dispatcher
//! ├── github/           # GitHub API surface
//! │   ├── mod           # Client trait and API types
//! │   └── rest          # reqwest implementation
//! └── error             # Error taxonomy
//! ```
//!
//! # Features
//!
//! - Sealed-box encryption interoperable with GitHub's secret decryption
//! - One concurrent worker per target repository
//! - Repository- and environment-scoped secrets and variables
//! - Dry-run previews with masked secret values
//! - Continue-on-error or cancel-on-first-error batch semantics

pub mod cli;
pub mod core;
pub mod error;
pub mod github;
