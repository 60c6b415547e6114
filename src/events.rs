use crate::model::{Catalog, PlayMode, PlaybackState, Track};
use crossbeam_channel::Sender;
use std::path::PathBuf;

/// Changes the presentation layer needs to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DataChanged {
        catalog: Catalog,
        mode: PlayMode,
    },
    StateChanged {
        state: PlaybackState,
        track: Option<Track>,
    },
    ModeChanged(PlayMode),
    VolumeChanged(u8),
    PlaybackFailed {
        path: PathBuf,
        reason: String,
    },
}

/// Receives notifications synchronously on the control thread.
pub trait Observer {
    fn notify(&self, notification: Notification);
}

impl Observer for Sender<Notification> {
    fn notify(&self, notification: Notification) {
        if self.send(notification).is_err() {
            tracing::debug!("observer channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn channel_observer_forwards_in_order() {
        let (tx, rx) = unbounded();
        tx.notify(Notification::ModeChanged(PlayMode::Loop));
        tx.notify(Notification::VolumeChanged(55));

        let received: Vec<Notification> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                Notification::ModeChanged(PlayMode::Loop),
                Notification::VolumeChanged(55)
            ]
        );
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = unbounded();
        drop(rx);
        tx.notify(Notification::ModeChanged(PlayMode::Random));
    }
}
