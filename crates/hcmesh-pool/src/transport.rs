//! PE group plumbing: ownership, barriers and root broadcast.
//!
//! A [`Transport`] is one PE's handle on its group. Serial runs use a
//! group of one, for which every collective operation is a no-op.
//! Distributed runs create `npes` transports with [`Transport::group`]
//! and move each one to its own thread.

use std::sync::{Arc, Barrier};

use crossbeam_channel::{Receiver, Sender};
use hcmesh_core::{GridIndex, PeId};
use log::{debug, error};

use crate::coherency::CoherencySet;

struct PeGroup {
    npes: u32,
    barrier: Barrier,
    senders: Vec<Sender<CoherencySet>>,
    receivers: Vec<Receiver<CoherencySet>>,
}

impl PeGroup {
    fn new(npes: u32) -> Arc<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..npes)
            .map(|_| crossbeam_channel::unbounded::<CoherencySet>())
            .unzip();
        Arc::new(Self {
            npes,
            barrier: Barrier::new(npes as usize),
            senders,
            receivers,
        })
    }
}

/// One PE's view of its group.
#[derive(Clone)]
pub struct Transport {
    group: Arc<PeGroup>,
    me: PeId,
}

impl Transport {
    /// A group of one PE.
    pub fn serial() -> Self {
        Self {
            group: PeGroup::new(1),
            me: PeId::ROOT,
        }
    }

    /// Create `npes` transports sharing one group, indexed by PE id.
    ///
    /// # Panics
    ///
    /// Panics if `npes == 0`.
    pub fn group(npes: u32) -> Vec<Self> {
        assert!(npes > 0, "a PE group needs at least one PE");
        let group = PeGroup::new(npes);
        (0..npes)
            .map(|p| Self {
                group: Arc::clone(&group),
                me: PeId(p),
            })
            .collect()
    }

    /// This PE.
    pub fn me(&self) -> PeId {
        self.me
    }

    /// Number of PEs in the group.
    pub fn npes(&self) -> u32 {
        self.group.npes
    }

    /// Whether this is a single-PE group.
    pub fn is_serial(&self) -> bool {
        self.group.npes == 1
    }

    /// The PE owning record `h`.
    #[inline]
    pub fn owner(&self, h: GridIndex) -> PeId {
        PeId(h % self.group.npes)
    }

    /// Whether record `h` is owned by this PE.
    #[inline]
    pub fn is_local(&self, h: GridIndex) -> bool {
        h % self.group.npes == self.me.0
    }

    /// Block until every PE in the group has arrived.
    pub fn barrier(&self) {
        if !self.is_serial() {
            self.group.barrier.wait();
        }
    }

    /// Collective: every PE returns `root`'s `value`.
    ///
    /// Barrier, root sends to every other PE, receivers block, barrier.
    pub(crate) fn broadcast(&self, root: PeId, value: CoherencySet) -> CoherencySet {
        if self.is_serial() {
            return value;
        }
        self.barrier();
        let out = if self.me == root {
            for (p, tx) in self.group.senders.iter().enumerate() {
                if p as u32 != root.0 && tx.send(value).is_err() {
                    error!("pe {}: coherency broadcast to pe {p} failed", self.me);
                }
            }
            value
        } else {
            match self.group.receivers[self.me.0 as usize].recv() {
                Ok(v) => v,
                Err(_) => {
                    // The group owns both ends, so this only happens during teardown.
                    error!("pe {}: coherency broadcast channel closed", self.me);
                    value
                }
            }
        };
        self.barrier();
        debug!("pe {}: coherency set from pe {root}: {out}", self.me);
        out
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("me", &self.me)
            .field("npes", &self.group.npes)
            .finish()
    }
}
