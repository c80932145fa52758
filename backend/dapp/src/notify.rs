//! Single-slot notification publisher.
//!
//! Each screen owns one [`Notifier`]. Showing a notice replaces whatever is on
//! display and cancels its dismissal timer, so at most one notice is ever
//! visible per screen.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub content: String,
    pub duration_ms: u64,
    pub shown_at: DateTime<Utc>,
}

/// How a notice left the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    /// Its display duration ran out.
    Elapsed,
    /// A newer notice took the slot first.
    Replaced,
}

#[derive(Default)]
struct Slot {
    seq: u64,
    timer: Option<CancellationToken>,
}

#[derive(Clone)]
pub struct Notifier {
    slot: Arc<Mutex<Slot>>,
    current: Arc<watch::Sender<Option<Notice>>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            current: Arc::new(current),
        }
    }

    /// Display `content` for `duration`, replacing the current notice.
    pub fn show(&self, kind: NoticeKind, content: &str, duration: Duration) -> NoticeHandle {
        let token = CancellationToken::new();
        // Publishing under the slot lock keeps the visible notice in id order.
        let id = {
            let mut slot = self.lock();
            if let Some(previous) = slot.timer.replace(token.clone()) {
                previous.cancel();
            }
            slot.seq += 1;
            self.current.send_replace(Some(Notice {
                id: slot.seq,
                kind,
                content: content.to_string(),
                duration_ms: duration.as_millis() as u64,
                shown_at: Utc::now(),
            }));
            slot.seq
        };

        let (done_tx, done_rx) = oneshot::channel();
        let notifier = self.clone();
        tokio::spawn(async move {
            let dismissal = tokio::select! {
                _ = token.cancelled() => Dismissal::Replaced,
                _ = tokio::time::sleep(duration) => Dismissal::Elapsed,
            };
            if dismissal == Dismissal::Elapsed {
                notifier.dismiss(id);
            }
            let _ = done_tx.send(dismissal);
        });

        NoticeHandle { id, done: done_rx }
    }

    pub fn current(&self) -> Option<Notice> {
        self.current.borrow().clone()
    }

    fn dismiss(&self, id: u64) {
        let mut slot = self.lock();
        if slot.seq == id {
            slot.timer = None;
        }
        self.current.send_if_modified(|shown| {
            if shown.as_ref().map(|n| n.id) == Some(id) {
                *shown = None;
                true
            } else {
                false
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Resolves when the notice it was returned for leaves the screen.
pub struct NoticeHandle {
    pub id: u64,
    done: oneshot::Receiver<Dismissal>,
}

impl NoticeHandle {
    pub async fn dismissed(self) -> Dismissal {
        self.done.await.unwrap_or(Dismissal::Replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn notice_is_cleared_after_its_duration() {
        let notifier = Notifier::new();
        let handle = notifier.show(NoticeKind::Success, "Transaction Successful", Duration::from_millis(1500));
        assert_eq!(notifier.current().unwrap().content, "Transaction Successful");

        assert_eq!(handle.dismissed().await, Dismissal::Elapsed);
        assert!(notifier.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_notice_supersedes_older() {
        let notifier = Notifier::new();
        let pending = notifier.show(NoticeKind::Loading, "Transaction is Pending...", Duration::from_secs(5));
        let failed = notifier.show(NoticeKind::Error, "Transaction Failed", Duration::from_millis(1500));

        let shown = notifier.current().unwrap();
        assert_eq!(shown.kind, NoticeKind::Error);
        assert_eq!(shown.id, failed.id);

        assert_eq!(pending.dismissed().await, Dismissal::Replaced);
        assert_eq!(notifier.current().unwrap().id, failed.id);

        assert_eq!(failed.dismissed().await, Dismissal::Elapsed);
        assert!(notifier.current().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_shows_never_leave_a_notice_behind() {
        let notifier = Notifier::new();
        let mut stuck = 0;
        for _ in 0..200 {
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let racers: Vec<_> = (0..2)
                .map(|_| {
                    let notifier = notifier.clone();
                    let barrier = barrier.clone();
                    tokio::task::spawn_blocking(move || {
                        barrier.wait();
                        notifier.show(NoticeKind::Success, "Transaction Successful", Duration::from_millis(1))
                    })
                })
                .collect();
            for racer in racers {
                racer.await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            if notifier.current().is_some() {
                stuck += 1;
            }
        }
        assert_eq!(stuck, 0);
    }
}
