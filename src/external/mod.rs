pub mod calendar;
#[cfg(any(test, feature = "test-support"))]
pub mod fakes;
pub mod identity;
pub mod notifier;
