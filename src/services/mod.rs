pub mod bridge;
pub mod handle;
pub mod pool;
pub mod tracker;
