//! Service layer
//!
//! Services hold the state the poller shares with its consumers: the
//! "new image ready" notification and the Horde online indicator. Both are
//! observable values owned by the coordinator and handed out by `Arc`.

mod health;
mod notification;

pub use health::HordeHealth;
pub use notification::{ImageNotice, NoticeKind, NotificationState};
