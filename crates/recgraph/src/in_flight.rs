use crate::{err, Result};

use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

type Outcome = Option<Result<()>>;

/// Tracks a single outstanding backend operation so concurrent callers share
/// it instead of issuing duplicate requests.
#[derive(Default)]
pub(crate) struct InFlight {
    slot: Mutex<Option<watch::Receiver<Outcome>>>,
}

pub(crate) enum Turn<'a> {
    /// The caller performs the operation and must report through
    /// [`Leader::finish`].
    Leader(Leader<'a>),

    /// Another caller is already performing it.
    Follower(watch::Receiver<Outcome>),
}

pub(crate) struct Leader<'a> {
    in_flight: &'a InFlight,
    tx: watch::Sender<Outcome>,
    finished: bool,
}

impl InFlight {
    pub(crate) fn turn(&self) -> Turn<'_> {
        let mut slot = self.lock();
        if let Some(rx) = slot.as_ref() {
            return Turn::Follower(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        *slot = Some(rx);
        Turn::Leader(Leader {
            in_flight: self,
            tx,
            finished: false,
        })
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<watch::Receiver<Outcome>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Leader<'_> {
    /// Publishes the outcome to every follower and frees the slot.
    pub(crate) fn finish(mut self, result: Result<()>) -> Result<()> {
        self.in_flight.lock().take();
        self.finished = true;
        let _ = self.tx.send(Some(result.clone()));
        result
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        // A cancelled leader must not wedge the slot. Followers observe the
        // closed channel.
        if !self.finished {
            self.in_flight.lock().take();
        }
    }
}

/// Waits for the leader of an operation and returns its outcome.
pub(crate) async fn follow(mut rx: watch::Receiver<Outcome>) -> Result<()> {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => match &*outcome {
            Some(result) => result.clone(),
            None => Err(err!("in-flight operation finished without an outcome")),
        },
        Err(_) => Err(err!("in-flight operation was abandoned before completing")),
    }
}
