pub mod entities;
pub mod messaging;
pub mod repositories;

// SQLx 实现（仅在启用 sqlx-support feature 时编译）
#[cfg(feature = "sqlx-support")]
pub mod sqlx_impls;

pub use entities::*;
pub use messaging::*;
pub use repositories::*;
pub use mailer_errors::{MailerError, MailerResult};
