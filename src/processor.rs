//! Batch drivers: the array executor, the paginated driver, the resumable
//! facade, and the per-item window both drivers share.

pub mod array;
pub mod page;
pub mod paginated;
pub mod result;
pub mod resumable;
mod window;
