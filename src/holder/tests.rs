use super::*;
use crate::static_holder;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_new_holder_is_empty() {
    let holder: Holder<u32> = Holder::new();
    assert_eq!(holder.state(), State::Uninitialized);
    assert!(!holder.is_initialized());
    assert!(!holder.is_constructing_on_current_thread());
    assert_eq!(holder.get(), None);
}

#[test]
fn test_get_or_init_constructs_once() {
    let holder = Holder::new();
    let calls = AtomicUsize::new(0);

    let a = holder
        .get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        })
        .unwrap();
    let b = holder
        .get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            7
        })
        .unwrap();

    assert_eq!(*a, 42);
    assert!(core::ptr::eq(a, b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(holder.state(), State::Initialized);
}

#[test]
fn test_state_is_constructing_inside_constructor() {
    let holder: Holder<u8> = Holder::new();
    holder
        .get_or_init(|| {
            assert_eq!(holder.state(), State::Constructing);
            assert!(holder.is_constructing_on_current_thread());
            1
        })
        .unwrap();
    assert!(!holder.is_constructing_on_current_thread());
}

#[test]
fn test_reentrant_access_is_rejected_and_recoverable() {
    let holder: Holder<u32> = Holder::new();

    let result = holder.get_or_try_init(|| {
        let inner = holder.get_or_init(|| 1);
        assert_eq!(
            inner.unwrap_err(),
            InvalidState::ReentrantAccess { type_name: "u32" }
        );
        Err(InvalidState::ReentrantAccess { type_name: "u32" })
    });

    assert!(result.is_err());
    assert_eq!(holder.state(), State::Uninitialized);
    assert!(!holder.lock.is_locked());
    assert_eq!(holder.get_or_init(|| 5).copied(), Ok(5));
}

#[test]
fn test_failed_construction_leaves_slot_empty() {
    let holder: Holder<String> = Holder::new();
    let attempts = AtomicUsize::new(0);

    let first: Result<&String, std::io::Error> = holder.get_or_try_init(|| {
        attempts.fetch_add(1, Ordering::SeqCst);
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
    });
    assert_eq!(first.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    assert_eq!(holder.state(), State::Uninitialized);
    assert_eq!(holder.constructor.load(Ordering::SeqCst), thread_token::NONE);

    let second: Result<&String, std::io::Error> = holder.get_or_try_init(|| {
        attempts.fetch_add(1, Ordering::SeqCst);
        Ok("ready".to_owned())
    });
    assert_eq!(second.unwrap(), "ready");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_panicking_constructor_releases_everything() {
    let holder: Holder<u64> = Holder::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = holder.get_or_init(|| panic!("constructor exploded"));
    }));

    assert!(outcome.is_err());
    assert_eq!(holder.state(), State::Uninitialized);
    assert!(!holder.is_constructing_on_current_thread());
    assert!(!holder.lock.is_locked());
    assert_eq!(holder.get_or_init(|| 9).copied(), Ok(9));
}

#[test]
fn test_concurrent_callers_share_one_instance() {
    const THREADS: usize = 8;
    let holder = Arc::new(Holder::<usize>::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let holder = holder.clone();
            let calls = calls.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let value = holder
                    .get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        i
                    })
                    .unwrap();
                (value as *const usize as usize, *value)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_waiter_retries_after_failed_construction() {
    let holder: Holder<&'static str> = Holder::new();
    let entered = Barrier::new(2);
    let attempts = AtomicUsize::new(0);

    thread::scope(|s| {
        let failing = s.spawn(|| {
            holder.get_or_try_init(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                entered.wait();
                thread::sleep(Duration::from_millis(20));
                Err(InvalidState::DirectConstruction { type_name: "test" })
            })
        });

        entered.wait();
        let waiting = s.spawn(|| {
            holder.get_or_init(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                "second"
            })
        });

        assert!(failing.join().unwrap().is_err());
        assert_eq!(waiting.join().unwrap().copied(), Ok("second"));
    });

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_drop_releases_value() {
    let dropped = Arc::new(AtomicUsize::new(0));

    struct Tracked(Arc<AtomicUsize>);
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    {
        let holder = Holder::new();
        holder.get_or_init(|| Tracked(dropped.clone())).unwrap();
    }
    assert_eq!(dropped.load(Ordering::SeqCst), 1);

    {
        let _empty: Holder<Tracked> = Holder::new();
    }
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn test_debug_shows_state_and_value() {
    let holder: Holder<i32> = Holder::new();
    assert_eq!(
        format!("{holder:?}"),
        "Holder { state: Uninitialized, value: <empty> }"
    );
    holder.get_or_init(|| -4).unwrap();
    assert_eq!(
        format!("{holder:?}"),
        "Holder { state: Initialized, value: -4 }"
    );
}

static GAUGE_BUILDS: AtomicUsize = AtomicUsize::new(0);

/// Value type whose public constructor only works inside its own holder.
#[derive(Debug)]
struct Gauge {
    serial: usize,
}

impl Gauge {
    fn new() -> Result<Self, InvalidState> {
        Self::holder().with_permit(Self::build)
    }

    fn build(_permit: Permit<'_, Self>) -> Self {
        Gauge { serial: GAUGE_BUILDS.fetch_add(1, Ordering::SeqCst) }
    }
}

impl Singleton for Gauge {
    type Error = InvalidState;

    fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
        Self::new()
    }

    static_holder!(Gauge);
}

#[test]
fn test_with_permit_only_inside_sanctioned_construction() {
    assert_eq!(
        Gauge::new().unwrap_err(),
        InvalidState::DirectConstruction { type_name: type_name::<Gauge>() }
    );

    let gauge = Gauge::instance().unwrap();
    assert_eq!(gauge.serial, 0);

    assert_eq!(
        Gauge::new().unwrap_err(),
        InvalidState::AlreadyConstructed { type_name: type_name::<Gauge>() }
    );
    assert_eq!(GAUGE_BUILDS.load(Ordering::SeqCst), 1);
}

static METER_BUILDS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Meter;

impl Singleton for Meter {
    type Error = InvalidState;

    fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
        METER_BUILDS.fetch_add(1, Ordering::SeqCst);
        Ok(Meter)
    }

    static_holder!(Meter);
}

#[test]
fn test_foreign_holder_cannot_construct() {
    let foreign: Holder<Meter> = Holder::new();
    assert!(Meter::holder().is_sanctioned());
    assert!(!foreign.is_sanctioned());

    let denied = InvalidState::DirectConstruction { type_name: type_name::<Meter>() };
    assert_eq!(foreign.get_instance().unwrap_err(), denied);
    assert_eq!(foreign.try_get_instance().unwrap_err(), denied);
    assert_eq!(foreign.state(), State::Uninitialized);
    assert!(!foreign.lock.is_locked());
    assert_eq!(METER_BUILDS.load(Ordering::SeqCst), 0);

    // Even with the sanctioned holder mid-construction on this thread, a
    // foreign holder does not hand out permits.
    let sanctioned = Meter::holder().get_or_init(|| {
        assert_eq!(foreign.with_permit(|_| ()).unwrap_err(), denied);
        Meter
    });
    assert!(sanctioned.is_ok());
    assert_eq!(METER_BUILDS.load(Ordering::SeqCst), 0);
}

#[test]
fn test_with_permit_denied_to_other_threads_during_construction() {
    struct Slot;

    impl Singleton for Slot {
        type Error = InvalidState;

        fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
            let denied = thread::scope(|s| {
                s.spawn(|| Self::holder().with_permit(|_| ())).join().unwrap()
            });
            assert_eq!(
                denied.unwrap_err(),
                InvalidState::DirectConstruction { type_name: type_name::<Slot>() }
            );
            Self::holder().with_permit(|_| Slot)
        }

        static_holder!(Slot);
    }

    assert!(Slot::instance().is_ok());
}

static LATCH_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct Latch;

impl Singleton for Latch {
    type Error = InvalidState;

    fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
        LATCH_BUILDS.fetch_add(1, Ordering::SeqCst);
        // A joined helper must not block on the lock this call holds.
        let seen = thread::scope(|s| s.spawn(Latch::try_instance).join().unwrap());
        assert_eq!(
            seen.err(),
            Some(InvalidState::ConstructionInProgress { type_name: type_name::<Latch>() })
        );
        Ok(Latch)
    }

    static_holder!(Latch);
}

#[test]
fn test_try_get_instance_does_not_wait_on_constructor() {
    let first = Latch::try_instance().unwrap();
    let second = Latch::instance().unwrap();
    assert!(core::ptr::eq(first, second));
    assert_eq!(LATCH_BUILDS.load(Ordering::SeqCst), 1);
    assert!(!Latch::holder().lock.is_locked());
}
