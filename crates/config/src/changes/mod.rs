//! Snapshot diffing and change distribution

mod diff;
mod event;
mod notifier;

pub use diff::{diff, diff_with_sources};
pub use event::{ChangeEvent, ChangeNotification};
pub use notifier::{ChangeCallback, ChangeNotifier, ChangeReceiver, Subscription};
