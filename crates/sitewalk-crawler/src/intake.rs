use crossbeam_channel::{Receiver, Sender};

use crate::canonical::CanonicalUrl;

#[derive(Debug, Clone)]
pub struct IntakeSender {
    tx: Sender<CanonicalUrl>,
}

impl IntakeSender {
    pub fn stage(&self, url: CanonicalUrl) {
        if let Err(e) = self.tx.send(url) {
            log::error!("Couldn't stage discovered url: {e}");
        }
    }
}

/// Staging area between fetch tasks (many producers) and the controller (one consumer).
#[derive(Debug)]
pub struct Intake {
    tx: Sender<CanonicalUrl>,
    rx: Receiver<CanonicalUrl>,
}

impl Default for Intake {
    fn default() -> Self {
        Self::new()
    }
}

impl Intake {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> IntakeSender {
        IntakeSender {
            tx: self.tx.clone(),
        }
    }

    /// Takes everything staged so far. Urls staged while draining are either part of
    /// this batch or left for the next one, never both.
    pub fn drain(&self) -> Vec<CanonicalUrl> {
        self.rx.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
