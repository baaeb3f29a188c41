//! Keeps every mounted view of a key in sync after a write.
//!
//! Notifications carry no payload: a handler only learns "key X changed" and
//! re-reads it through the content store. Two notifications for the same key
//! may be observed as one; each one triggers a full re-read anyway.
//!
//! [`LocalNotifier`] is a plain in-process observer list. [`OriginBus`]
//! models a browser origin with several tabs: a [`TabNotifier`]'s `publish`
//! re-broadcasts to its own subscribers (the platform storage event never
//! fires in the tab that wrote) and forwards a storage event to every other
//! open tab.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::{debug, warn};

pub type ChangeHandler = Arc<dyn Fn() + Send + Sync>;

pub trait Notifier: Send + Sync {
    fn subscribe(&self, key: &str, handler: ChangeHandler) -> Subscription;

    fn publish(&self, key: &str);
}

/// Handle returned by [`Notifier::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the handler immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keeps the handler registered for the notifier's whole lifetime.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(u64, String, ChangeHandler)>,
}

impl ListenerTable {
    fn handlers_for(&self, key: &str) -> Vec<ChangeHandler> {
        self.entries
            .iter()
            .filter(|(_, k, _)| k == key)
            .map(|(_, _, h)| Arc::clone(h))
            .collect()
    }
}

type SharedTable = Arc<Mutex<ListenerTable>>;

fn dispatch(table: &Mutex<ListenerTable>, key: &str) -> usize {
    // Handlers run without the lock held: they usually re-read the store and
    // may subscribe or unsubscribe from inside the callback.
    let handlers = match table.lock() {
        Ok(table) => table.handlers_for(key),
        Err(_) => {
            warn!("Listener table poisoned; dropping notification for '{}'", key);
            return 0;
        }
    };
    for handler in &handlers {
        handler();
    }
    handlers.len()
}

/// In-process observer list keyed by storage key.
#[derive(Clone, Default)]
pub struct LocalNotifier {
    table: SharedTable,
}

impl LocalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.table
            .lock()
            .map(|t| t.entries.iter().filter(|(_, k, _)| k == key).count())
            .unwrap_or(0)
    }

    fn downgrade(&self) -> Weak<Mutex<ListenerTable>> {
        Arc::downgrade(&self.table)
    }
}

impl Notifier for LocalNotifier {
    fn subscribe(&self, key: &str, handler: ChangeHandler) -> Subscription {
        let id = match self.table.lock() {
            Ok(mut table) => {
                table.next_id += 1;
                let id = table.next_id;
                table.entries.push((id, key.to_string(), handler));
                id
            }
            Err(_) => {
                warn!("Listener table poisoned; subscription to '{}' ignored", key);
                return Subscription::inert();
            }
        };

        let table = self.downgrade();
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                if let Ok(mut table) = table.lock() {
                    table.entries.retain(|(entry_id, _, _)| *entry_id != id);
                }
            }
        })
    }

    fn publish(&self, key: &str) {
        let delivered = dispatch(&self.table, key);
        debug!("Published change of '{}' to {} local listener(s)", key, delivered);
    }
}

pub type TabId = u64;

#[derive(Default)]
struct OriginTabs {
    next_id: AtomicU64,
    tabs: Mutex<Vec<(TabId, Weak<Mutex<ListenerTable>>)>>,
}

/// All tabs of one origin sharing one storage area.
#[derive(Clone, Default)]
pub struct OriginBus {
    inner: Arc<OriginTabs>,
}

impl OriginBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_tab(&self) -> TabNotifier {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let local = LocalNotifier::new();
        if let Ok(mut tabs) = self.inner.tabs.lock() {
            tabs.push((id, local.downgrade()));
        }
        debug!("Opened tab {}", id);
        TabNotifier {
            id,
            local,
            bus: self.clone(),
        }
    }

    /// Number of tabs whose notifier is still alive.
    pub fn open_tabs(&self) -> usize {
        self.inner
            .tabs
            .lock()
            .map(|tabs| tabs.iter().filter(|(_, t)| t.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Fires a storage event for `key` in every open tab except `origin`.
    fn dispatch_storage_event(&self, origin: TabId, key: &str) {
        let targets: Vec<SharedTable> = match self.inner.tabs.lock() {
            Ok(mut tabs) => {
                tabs.retain(|(_, table)| table.strong_count() > 0);
                tabs.iter()
                    .filter(|(id, _)| *id != origin)
                    .filter_map(|(_, table)| table.upgrade())
                    .collect()
            }
            Err(_) => {
                warn!("Origin tab list poisoned; storage event for '{}' dropped", key);
                return;
            }
        };

        for table in &targets {
            dispatch(table, key);
        }
    }
}

/// One tab's view of the origin bus.
pub struct TabNotifier {
    id: TabId,
    local: LocalNotifier,
    bus: OriginBus,
}

impl TabNotifier {
    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.local.listener_count(key)
    }
}

impl Notifier for TabNotifier {
    fn subscribe(&self, key: &str, handler: ChangeHandler) -> Subscription {
        self.local.subscribe(key, handler)
    }

    fn publish(&self, key: &str) {
        self.local.publish(key);
        self.bus.dispatch_storage_event(self.id, key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, ChangeHandler) {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler_hits = Arc::clone(&hits);
        let handler: ChangeHandler = Arc::new(move || {
            handler_hits.fetch_add(1, Ordering::SeqCst);
        });
        (hits, handler)
    }

    #[test]
    fn publish_reaches_only_matching_key() {
        let notifier = LocalNotifier::new();
        let (articles, on_articles) = counter();
        let (news, on_news) = counter();
        let _a = notifier.subscribe("articles", on_articles);
        let _n = notifier.subscribe("news", on_news);

        notifier.publish("articles");

        assert_eq!(articles.load(Ordering::SeqCst), 1);
        assert_eq!(news.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let notifier = LocalNotifier::new();
        let (hits, handler) = counter();
        let sub = notifier.subscribe("gallery", handler);
        assert_eq!(notifier.listener_count("gallery"), 1);

        drop(sub);
        notifier.publish("gallery");

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.listener_count("gallery"), 0);
    }

    #[test]
    fn detached_subscription_stays_registered() {
        let notifier = LocalNotifier::new();
        let (hits, handler) = counter();
        notifier.subscribe("news", handler).detach();

        notifier.publish("news");
        notifier.publish("news");

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn handler_may_subscribe_while_being_notified() {
        let notifier = LocalNotifier::new();
        let inner = notifier.clone();
        let handler: ChangeHandler = Arc::new(move || {
            inner.subscribe("articles", Arc::new(|| {})).detach();
        });
        notifier.subscribe("articles", handler).detach();

        notifier.publish("articles");

        assert_eq!(notifier.listener_count("articles"), 2);
    }

    #[test]
    fn tab_publish_reaches_own_and_other_tabs() {
        let bus = OriginBus::new();
        let tab_a = bus.open_tab();
        let tab_b = bus.open_tab();
        let (a_hits, on_a) = counter();
        let (b_hits, on_b) = counter();
        let _a = tab_a.subscribe("articles", on_a);
        let _b = tab_b.subscribe("articles", on_b);

        tab_a.publish("articles");

        assert_eq!(a_hits.load(Ordering::SeqCst), 1);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
        assert_ne!(tab_a.id(), tab_b.id());
    }

    #[test]
    fn closed_tabs_are_skipped() {
        let bus = OriginBus::new();
        let tab_a = bus.open_tab();
        let tab_b = bus.open_tab();
        assert_eq!(bus.open_tabs(), 2);

        drop(tab_b);
        tab_a.publish("news");

        assert_eq!(bus.open_tabs(), 1);
    }
}
