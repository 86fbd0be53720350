/*!
 * Synchronization Helpers
 * Adaptive waiting used by polling loops that cannot park on a condvar
 */

mod backoff;

pub use backoff::{wait_until, Backoff};
