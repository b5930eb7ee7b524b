//! # Ward Core
//!
//! 病房床位分配系统的核心模块，提供基础数据结构、错误定义、存储接口和通用工具。

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::{Result, WardError};
pub use models::*;
pub use repository::WardRepository;
