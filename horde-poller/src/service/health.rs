//! Horde availability indicator

use tokio::sync::watch;

/// Observable "Horde API online" flag, assumed online until a heartbeat fails
pub struct HordeHealth {
    tx: watch::Sender<bool>,
}

impl HordeHealth {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx }
    }

    /// Records the latest heartbeat result, returning whether the flag flipped
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        })
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for HordeHealth {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_online_reports_flips_only() {
        let health = HordeHealth::new();
        assert!(health.is_online());

        assert!(!health.set_online(true));
        assert!(health.set_online(false));
        assert!(!health.is_online());
        assert!(!health.set_online(false));
        assert!(health.set_online(true));
    }
}
