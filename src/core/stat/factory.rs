use super::{InvocationStat, InvocationStatDimension, InvocationStatSnapshot};
use crate::{
    base::{ConsumerConfig, ProviderInfo},
    logging,
};
use std::collections::{hash_map::Entry, HashMap};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    mpsc::{channel, Receiver, Sender},
    Arc, Mutex, RwLock,
};

/// A stat is released after `MAX_USELESS_CYCLE` successive measurements without calls.
pub const MAX_USELESS_CYCLE: u32 = 6;

/// `StatEvent` notifies the subscribers of a change of the stat set.
#[derive(Debug, Clone)]
pub enum StatEvent {
    Added(Arc<InvocationStat>),
    Removed(Arc<InvocationStat>),
}

pub type ListenerId = u64;

// the provider instance and the consumer
type StatKey = (usize, Arc<ConsumerConfig>);

/// `InvocationStatFactory` owns the `InvocationStat`s of all dimensions.
/// A stat is created the first time a dimension is observed,
/// each creation and removal is published to the subscribers over their channels.
#[derive(Default)]
pub struct InvocationStatFactory {
    all_stats: RwLock<HashMap<StatKey, Arc<InvocationStat>>>,
    listeners: Mutex<Vec<(ListenerId, Sender<StatEvent>)>>,
    next_listener_id: AtomicU64,
}

impl InvocationStatFactory {
    pub fn new() -> Self {
        InvocationStatFactory::default()
    }

    /// `get_invocation_stat` returns the stat of the dimension (`consumer`, `provider`),
    /// creating it on first use.
    pub fn get_invocation_stat(
        &self,
        consumer: &Arc<ConsumerConfig>,
        provider: &Arc<ProviderInfo>,
    ) -> Arc<InvocationStat> {
        let key: StatKey = (Arc::as_ptr(provider) as usize, Arc::clone(consumer));
        if let Some(stat) = self.all_stats.read().unwrap().get(&key) {
            return Arc::clone(stat);
        }
        let stat = {
            let mut all_stats = self.all_stats.write().unwrap();
            match all_stats.entry(key) {
                Entry::Occupied(e) => return Arc::clone(e.get()),
                Entry::Vacant(e) => {
                    let dimension = InvocationStatDimension::new(provider, Arc::clone(consumer));
                    let stat = Arc::new(InvocationStat::new(Arc::new(dimension)));
                    e.insert(Arc::clone(&stat));
                    stat
                }
            }
        };
        logging::debug!(
            "[InvocationStatFactory] New invocation stat of {}",
            stat.dimension()
        );
        self.notify(StatEvent::Added(Arc::clone(&stat)));
        stat
    }

    /// `remove_invocation_stat` removes the stat, if it is still the one held for its dimension.
    pub fn remove_invocation_stat(&self, stat: &Arc<InvocationStat>) -> bool {
        let key = key_of(stat.dimension());
        let removed = {
            let mut all_stats = self.all_stats.write().unwrap();
            match all_stats.get(&key) {
                Some(held) if Arc::ptr_eq(held, stat) => all_stats.remove(&key),
                _ => None,
            }
        };
        match removed {
            Some(stat) => {
                self.notify(StatEvent::Removed(stat));
                true
            }
            None => false,
        }
    }

    /// `release_if_useless` evicts a stat which has seen no calls
    /// for more than `MAX_USELESS_CYCLE` measurements.
    pub fn release_if_useless(&self, stat: &Arc<InvocationStat>) -> bool {
        if stat.useless_cycle() <= MAX_USELESS_CYCLE {
            return false;
        }
        let removed = self.remove_invocation_stat(stat);
        if removed {
            logging::debug!(
                "[InvocationStatFactory] Remove invocation stat of {} because of useless cycle > {}",
                stat.dimension(),
                MAX_USELESS_CYCLE
            );
        }
        removed
    }

    /// `update_invocation_stats` rolls the held stats forward by the given window snapshots.
    pub fn update_invocation_stats(&self, snapshots: &[InvocationStatSnapshot]) {
        let all_stats = self.all_stats.read().unwrap();
        for snapshot in snapshots {
            if let Some(stat) = all_stats.get(&key_of(snapshot.dimension())) {
                stat.update(snapshot);
            }
        }
    }

    pub fn all_invocation_stats(&self) -> Vec<Arc<InvocationStat>> {
        self.all_stats.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.all_stats.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `subscribe` registers a new listener of the stat set,
    /// the events are delivered over the returned channel.
    pub fn subscribe(&self) -> (ListenerId, Receiver<StatEvent>) {
        let (tx, rx) = channel();
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, tx));
        (id, rx)
    }

    /// `unsubscribe` drops the listener, which closes its channel.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().unwrap().retain(|(lid, _)| *lid != id);
    }

    fn notify(&self, event: StatEvent) {
        // listeners whose receiver is gone are dropped
        self.listeners
            .lock()
            .unwrap()
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

fn key_of(dimension: &InvocationStatDimension) -> StatKey {
    (dimension.provider_id(), Arc::clone(dimension.consumer()))
}
