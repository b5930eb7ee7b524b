//! # 病房数据库模块
//!
//! 负责候床队列、住院记录和物资申领的持久化，提供PostgreSQL连接池、
//! 事务化的多步写操作，以及用于演示和测试的内存实现。

pub mod connection;
pub mod memory;
pub mod models;
pub mod queries;

// 重新导出主要类型
pub use connection::{DatabasePool, PoolSettings};
pub use memory::MemoryRepository;
pub use queries::DatabaseQueries;
