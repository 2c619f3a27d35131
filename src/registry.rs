//! Process-wide registry of holders, keyed by type identity.
//!
//! Gives every `T` exactly one [`Holder<T>`] without requiring a `static` per
//! type. Holders are leaked on first use and live until process exit.
//!
//! The shared table sits behind an `RwLock`, but each thread keeps its own
//! cache of entries it has already resolved. Once a thread has seen a type,
//! looking it up again takes no lock and never waits on a registering thread.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::holder::Holder;
use crate::trace::trace_debug;

type Entry = &'static (dyn Any + Send + Sync);

fn table() -> &'static RwLock<HashMap<TypeId, Entry>> {
    static TABLE: OnceLock<RwLock<HashMap<TypeId, Entry>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

thread_local! {
    static CACHE: RefCell<HashMap<TypeId, Entry>> = RefCell::new(HashMap::new());
}

/// Looks `id` up in the calling thread's cache. `None` during thread teardown.
fn cached(id: TypeId) -> Option<Entry> {
    CACHE
        .try_with(|cache| cache.borrow().get(&id).copied())
        .ok()
        .flatten()
}

fn remember(id: TypeId, entry: Entry) {
    // Ignored during thread teardown; the shared table still has the entry.
    let _ = CACHE.try_with(|cache| cache.borrow_mut().insert(id, entry));
}

/// Returns the unique holder for `T`, creating it on first use.
///
/// The registry lock is released before returning, so constructors may
/// freely reach other registered singletons. Repeat calls on the same thread
/// are served from the thread's cache without locking.
pub fn holder<T: Send + Sync + 'static>() -> &'static Holder<T> {
    let id = TypeId::of::<T>();
    if let Some(entry) = cached(id) {
        return downcast(entry);
    }
    let entry = lookup_or_register::<T>(id);
    remember(id, entry);
    downcast(entry)
}

fn lookup_or_register<T: Send + Sync + 'static>(id: TypeId) -> Entry {
    // Poisoning only means a panic elsewhere while the map was locked; inserts
    // are idempotent, so the map is still consistent.
    let found = table()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .copied();
    if let Some(entry) = found {
        return entry;
    }

    let mut map = table().write().unwrap_or_else(PoisonError::into_inner);
    *map.entry(id).or_insert_with(|| -> Entry {
        trace_debug!(type_name = type_name::<T>(), "registering singleton holder");
        Box::leak(Box::new(Holder::<T>::new()))
    })
}

/// Returns `true` if a holder for `T` has been registered.
pub fn is_registered<T: 'static>() -> bool {
    table()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<T>())
}

fn downcast<T: 'static>(entry: Entry) -> &'static Holder<T> {
    match entry.downcast_ref::<Holder<T>>() {
        Some(holder) => holder,
        None => unreachable!("registry entry for `{}` has a foreign type", type_name::<T>()),
    }
}
