//! Singleton Usage Examples
//!
//! Demonstrates lazy construction, sharing across threads, guarded
//! construction and retry after failure.

use lazy_singleton::{static_holder, Holder, InvalidState, Permit, Singleton};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

static LOADS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct AppConfig {
    endpoint: String,
    workers: usize,
}

impl AppConfig {
    fn load(_permit: Permit<'_, Self>) -> Self {
        LOADS.fetch_add(1, Ordering::SeqCst);
        println!("  Loading configuration...");
        thread::sleep(Duration::from_millis(10));
        AppConfig {
            endpoint: "https://api.example.com".into(),
            workers: 4,
        }
    }
}

impl Singleton for AppConfig {
    type Error = InvalidState;

    fn construct(permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
        Ok(AppConfig::load(permit))
    }

    static_holder!(AppConfig);
}

static CONNECT_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Connection {
    attempt: usize,
}

impl Singleton for Connection {
    type Error = anyhow::Error;

    fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
        let attempt = CONNECT_ATTEMPTS.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt < 3 {
            anyhow::bail!("connection refused (attempt {attempt})");
        }
        Ok(Connection { attempt })
    }
}

fn main() -> anyhow::Result<()> {
    println!("Singleton Usage Examples");
    println!("========================");

    println!("\n1. Shared across threads:");
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let config = AppConfig::instance()?;
                println!("  thread {i}: {} with {} workers", config.endpoint, config.workers);
                Ok::<_, InvalidState>(config as *const AppConfig as usize)
            })
        })
        .collect();
    for h in handles {
        h.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
    }
    println!("  Loads performed: {}", LOADS.load(Ordering::SeqCst));

    println!("\n2. Guarded construction:");
    match AppConfig::holder().with_permit(AppConfig::load) {
        Ok(_) => println!("  unexpected second load"),
        Err(err) => println!("  rejected: {err}"),
    }
    let stray: Holder<AppConfig> = Holder::new();
    match stray.get_instance() {
        Ok(_) => println!("  unexpected second instance"),
        Err(err) => println!("  rejected: {err}"),
    }

    println!("\n3. Retry after failure:");
    loop {
        match Connection::instance() {
            Ok(conn) => {
                println!("  connected on attempt {}", conn.attempt);
                break;
            }
            Err(err) => println!("  {err}"),
        }
    }

    Ok(())
}
