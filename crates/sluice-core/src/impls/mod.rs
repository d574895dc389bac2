//! Impls - ports の実装（開発用・テスト用）
//!
//! Production queue clients and collaborators live outside this crate;
//! they only need to implement the traits in `ports`.

pub mod inmem_queue;

pub use self::inmem_queue::InMemoryQueueClient;
