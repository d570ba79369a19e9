//! Bounded admission gate with a completion barrier
//!
//! A [`Throttle`] lets at most `capacity` dispatched tasks run at once and
//! counts tasks that have been dispatched but not yet finished. Dispatchers
//! fire tasks without keeping their handles and later call
//! [`Throttle::wait_idle`] to block until every one of them has ended.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::logging::*;

#[derive(Debug)]
struct Pending {
	count: AtomicUsize,
	idle: Notify,
}

/// Shared concurrency limit for comparison, removal and copy tasks
#[derive(Debug, Clone)]
pub struct Throttle {
	slots: Arc<Semaphore>,
	pending: Arc<Pending>,
	capacity: usize,
}

/// Held by a running task; frees the slot and completion token on drop
struct TaskGuard {
	_permit: OwnedSemaphorePermit,
	pending: Arc<Pending>,
}

impl Drop for TaskGuard {
	fn drop(&mut self) {
		if self.pending.count.fetch_sub(1, Ordering::AcqRel) == 1 {
			self.pending.idle.notify_waiters();
		}
	}
}

impl Throttle {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Throttle {
			slots: Arc::new(Semaphore::new(capacity)),
			pending: Arc::new(Pending { count: AtomicUsize::new(0), idle: Notify::new() }),
			capacity,
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Tasks dispatched and not yet finished
	pub fn pending(&self) -> usize {
		self.pending.count.load(Ordering::Acquire)
	}

	/// Wait for a free slot, then spawn `task` on it
	///
	/// The slot and the completion token are released when the task ends,
	/// whether it returns or panics.
	pub async fn dispatch<F>(&self, task: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let permit = match self.slots.clone().acquire_owned().await {
			Ok(permit) => permit,
			Err(_) => {
				// The semaphore is never closed while a Throttle exists
				error!("Throttle closed, dropping task");
				return;
			}
		};
		self.pending.count.fetch_add(1, Ordering::AcqRel);
		let guard = TaskGuard { _permit: permit, pending: self.pending.clone() };

		tokio::spawn(async move {
			let _guard = guard;
			task.await;
		});
	}

	/// Block until every dispatched task has finished
	pub async fn wait_idle(&self) {
		loop {
			let notified = self.pending.idle.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			if self.pending.count.load(Ordering::Acquire) == 0 {
				return;
			}
			notified.await;
		}
	}
}


// vim: ts=4
