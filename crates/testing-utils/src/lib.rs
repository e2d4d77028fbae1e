//! # Mailer Testing Utils
//!
//! 各 crate 共用的测试替身和测试数据构建器。
//!
//! ```toml
//! [dev-dependencies]
//! mailer-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! ```rust
//! use mailer_testing_utils::mocks::*;
//! use mailer_testing_utils::builders::MailJobBuilder;
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
