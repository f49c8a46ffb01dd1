//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: Lifecycle of a single crawl task (admitted, fetching, extracted, etc.)
//! - `TaskProgress`: A task's current state with validated transitions
//! - `RateLimiter`: Session-wide spacing between document fetches

mod rate_limiter;
mod task_state;

// Re-export main types
pub use rate_limiter::{effective_delay, RateLimiter};
pub use task_state::{TaskProgress, TaskState};
