//! Selector Subscriptions
//!
//! Consumers register a selector that derives a slice of the graph (for
//! example "edges touching node X") and a listener. After every committed
//! mutation the selector is re-evaluated and the listener runs only if the
//! derived value changed.

use crate::graph::GraphState;
use std::fmt;

/// Handle returned by `GraphStore::subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Watcher = Box<dyn FnMut(&GraphState) + Send>;

#[derive(Default)]
pub(crate) struct Subscriptions {
    next_id: u64,
    watchers: Vec<(SubscriptionId, Watcher)>,
}

impl Subscriptions {
    pub(crate) fn add<T, S, F>(
        &mut self,
        state: &GraphState,
        selector: S,
        mut listener: F,
    ) -> SubscriptionId
    where
        T: PartialEq + Send + 'static,
        S: Fn(&GraphState) -> T + Send + 'static,
        F: FnMut(&T) + Send + 'static,
    {
        let mut last = selector(state);
        let watcher: Watcher = Box::new(move |state: &GraphState| {
            let next = selector(state);
            if next != last {
                listener(&next);
                last = next;
            }
        });

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.watchers.push((id, watcher));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.watchers.len();
        self.watchers.retain(|(existing, _)| *existing != id);
        self.watchers.len() != before
    }

    pub(crate) fn notify(&mut self, state: &GraphState) {
        for (_, watcher) in self.watchers.iter_mut() {
            watcher(state);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.watchers.len()
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("count", &self.watchers.len())
            .finish()
    }
}
