//! Collection of per-task outcomes.
//!
//! Tasks never touch the totals directly. Each one holds a [`Recorder`], a
//! write-only handle onto a channel, and the [`ResultAggregator`] drains that
//! channel once every recorder has been dropped, which can only happen after
//! the tasks holding them have finished.

use tokio::sync::mpsc;

use crate::models::PackageId;

#[derive(Debug)]
enum Record {
    Attempt(PackageId),
    Match(PackageId),
}

/// Write handle given to each analysis task.
#[derive(Debug, Clone)]
pub struct Recorder {
    tx: mpsc::UnboundedSender<Record>,
}

impl Recorder {
    /// The package's analysis ran to completion.
    pub fn record_attempt(&self, package: &PackageId) {
        self.send(Record::Attempt(package.clone()));
    }

    /// The package exhibited the pattern. Call after [`Self::record_attempt`].
    pub fn record_match(&self, package: &PackageId) {
        self.send(Record::Match(package.clone()));
    }

    fn send(&self, record: Record) {
        // Receiver outlives every recorder.
        let _ = self.tx.send(record);
    }
}

/// Attempted and matched packages, each in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub attempted: Vec<PackageId>,
    pub matched: Vec<PackageId>,
}

pub struct ResultAggregator {
    tx: mpsc::UnboundedSender<Record>,
    rx: mpsc::UnboundedReceiver<Record>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn recorder(&self) -> Recorder {
        Recorder {
            tx: self.tx.clone(),
        }
    }

    /// Wait for every outstanding [`Recorder`] to be dropped and return what
    /// they recorded.
    pub async fn totals(self) -> Tally {
        let Self { tx, mut rx } = self;
        drop(tx);

        let mut tally = Tally::default();
        while let Some(record) = rx.recv().await {
            match record {
                Record::Attempt(package) => tally.attempted.push(package),
                Record::Match(package) => tally.matched.push(package),
            }
        }
        tally
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}
