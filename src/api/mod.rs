// ==========================================
// 羽绒拼配优化系统 - API 层
// ==========================================
// 职责: 提供拼配优化入口，供外部服务层调用
// ==========================================

pub mod blend_api;
pub mod error;

// 重导出核心类型
pub use blend_api::{optimize, BlendApi};
pub use error::{ApiError, ApiResult};
