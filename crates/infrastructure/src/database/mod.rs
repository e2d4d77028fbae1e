pub mod sqlite;

pub use sqlite::{DatabaseManager, SqliteMailJobRepository, SqliteRecipientStore};
