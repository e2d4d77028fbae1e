//! 内存实现，适用于测试和嵌入式运行

pub mod in_memory_mail_job_repository;
pub mod in_memory_recipient_store;

pub use in_memory_mail_job_repository::InMemoryMailJobRepository;
pub use in_memory_recipient_store::InMemoryRecipientStore;
