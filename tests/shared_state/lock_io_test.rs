/*!
 * Lock Scope Tests
 *
 * Log output must never be written while a shared-state lock is held, so a
 * slow subscriber on one thread cannot stall readers on another.
 */

use resource_kernel::{RegistryStatus, SharedCounterStore, SingletonRegistry};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::Level;

const WRITE_DELAY: Duration = Duration::from_millis(400);
const READER_START: Duration = Duration::from_millis(50);
const READER_BUDGET: Duration = Duration::from_millis(150);

/// Writer that stalls on every write, like a blocked terminal
struct StallingWriter {
    writes: Arc<AtomicUsize>,
}

impl io::Write for StallingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        thread::sleep(WRITE_DELAY);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` on a new thread whose log output goes through a stalling writer
fn spawn_with_stalling_logs<F, R>(writes: Arc<AtomicUsize>, f: F) -> thread::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    thread::spawn(move || {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_writer(move || StallingWriter {
                writes: Arc::clone(&writes),
            })
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    })
}

#[test]
fn test_registry_status_not_delayed_by_construction_logging() {
    let writes = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(SingletonRegistry::new(|| Ok(1u32)));

    let builder = {
        let registry = Arc::clone(&registry);
        spawn_with_stalling_logs(Arc::clone(&writes), move || {
            registry.get_or_create().map(|v| *v)
        })
    };

    thread::sleep(READER_START);
    let start = Instant::now();
    let status = registry.status();
    let waited = start.elapsed();

    assert_eq!(builder.join().unwrap().unwrap(), 1);
    assert!(writes.load(Ordering::SeqCst) > 0, "construction was not logged");
    assert_eq!(status, RegistryStatus::Ready);
    assert!(waited < READER_BUDGET, "status() waited {:?}", waited);
}

#[test]
fn test_counter_read_not_delayed_by_increment_logging() {
    let writes = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(SharedCounterStore::new());

    let writer = {
        let store = Arc::clone(&store);
        spawn_with_stalling_logs(Arc::clone(&writes), move || store.increment())
    };

    thread::sleep(READER_START);
    let start = Instant::now();
    let counter = store.read_counter();
    let waited = start.elapsed();

    assert_eq!(writer.join().unwrap().unwrap(), 1);
    assert!(writes.load(Ordering::SeqCst) > 0, "increment was not logged");
    assert_eq!(counter, 1);
    assert!(waited < READER_BUDGET, "read_counter() waited {:?}", waited);
}
