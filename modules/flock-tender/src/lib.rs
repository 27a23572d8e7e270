pub mod actuator;
pub mod lists;
pub mod reconcile;
pub mod stats;
pub mod sync;
pub mod tender;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
