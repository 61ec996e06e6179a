/*!
 * Synchronization Primitives
 * Semaphore and one-shot future built from parking_lot parts
 */

pub mod future;
pub mod semaphore;

pub use future::{channel, OnceFuture, Promise, PromiseAbandoned};
pub use semaphore::Semaphore;
