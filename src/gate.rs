//! Fair counting semaphore bounding concurrent dictionary access
//!
//! Readers take one permit, reconfiguration takes every permit and thus
//! waits for in-flight readers and holds back new ones. Permits are granted
//! strictly in arrival order: a reconfiguration waiting for all permits is
//! never overtaken by readers arriving after it.

use std::{
	collections::BTreeSet,
	sync::{Condvar, Mutex, MutexGuard, PoisonError},
	time::{Duration, Instant},
};

/// Waiting for permits took longer than allowed
#[derive(Debug, thiserror::Error)]
#[error("could not acquire {requested} gate permit(s) within {waited:?}")]
pub struct GateTimeout {
	/// Number of permits asked for
	pub requested: usize,
	/// Time spent waiting
	pub waited: Duration,
}

/// Fair counting semaphore
#[derive(Debug)]
pub struct Gate {
	capacity: usize,
	state: Mutex<GateState>,
	turn: Condvar,
}

#[derive(Debug)]
struct GateState {
	/// Permits not held by anyone
	available: usize,
	/// Ticket handed to the next caller
	next_ticket: u64,
	/// Ticket allowed to take permits once enough are available
	serving: u64,
	/// Tickets whose holder gave up waiting
	abandoned: BTreeSet<u64>,
}

impl GateState {
	fn take_ticket(&mut self) -> u64 {
		let ticket = self.next_ticket;
		self.next_ticket += 1;
		ticket
	}

	fn can_grant(&self, ticket: u64, count: usize) -> bool {
		self.serving == ticket && self.available >= count
	}

	fn grant(&mut self, count: usize) {
		self.available -= count;
		self.advance();
	}

	/// Move to the next ticket still waited on
	fn advance(&mut self) {
		self.serving += 1;
		while self.abandoned.remove(&self.serving) {
			self.serving += 1;
		}
	}
}

impl Gate {
	/// Gate with `capacity` permits, at least one
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			capacity,
			state: Mutex::new(GateState {
				available: capacity,
				next_ticket: 0,
				serving: 0,
				abandoned: BTreeSet::new(),
			}),
			turn: Condvar::new(),
		}
	}

	/// Total number of permits
	#[must_use]
	pub const fn capacity(&self) -> usize {
		self.capacity
	}

	/// Permits not held right now
	pub fn available(&self) -> usize {
		self.state().available
	}

	/// Callers queued for permits
	pub fn waiting(&self) -> usize {
		let state = self.state();
		let queued = state.next_ticket - state.serving;
		usize::try_from(queued).unwrap_or(usize::MAX) - state.abandoned.len()
	}

	/// Block until a single permit is granted
	pub fn acquire(&self) -> Permit<'_> {
		self.acquire_many(1)
	}

	/// Block until every permit is granted
	pub fn acquire_all(&self) -> Permit<'_> {
		self.acquire_many(self.capacity)
	}

	/// Block until `count` permits are granted at once
	///
	/// # Panics
	///
	/// Panics if `count` exceeds the gate capacity, such a request could
	/// never be granted.
	pub fn acquire_many(&self, count: usize) -> Permit<'_> {
		assert!(count <= self.capacity, "asked for {count} permits out of {}", self.capacity);

		let mut state = self.state();
		let ticket = state.take_ticket();
		while !state.can_grant(ticket, count) {
			state = self.turn.wait(state).unwrap_or_else(PoisonError::into_inner);
		}
		state.grant(count);
		drop(state);

		// the next ticket may be satisfiable right away
		self.turn.notify_all();
		Permit { gate: self, count }
	}

	/// Like [`Gate::acquire_many`] but gives up after `timeout`
	///
	/// A caller that gives up leaves the queue without holding back the
	/// callers behind it.
	///
	/// # Errors
	///
	/// Returns [`GateTimeout`] if the permits were not granted in time.
	///
	/// # Panics
	///
	/// Panics if `count` exceeds the gate capacity.
	pub fn try_acquire_for(&self, count: usize, timeout: Duration) -> Result<Permit<'_>, GateTimeout> {
		assert!(count <= self.capacity, "asked for {count} permits out of {}", self.capacity);

		let start = Instant::now();
		let mut state = self.state();
		let ticket = state.take_ticket();
		while !state.can_grant(ticket, count) {
			let remaining = timeout.saturating_sub(start.elapsed());
			if remaining.is_zero() {
				if state.serving == ticket {
					state.advance();
				} else {
					state.abandoned.insert(ticket);
				}
				drop(state);
				self.turn.notify_all();

				return Err(GateTimeout {
					requested: count,
					waited: start.elapsed(),
				});
			}

			state = self
				.turn
				.wait_timeout(state, remaining)
				.unwrap_or_else(PoisonError::into_inner)
				.0;
		}
		state.grant(count);
		drop(state);

		self.turn.notify_all();
		Ok(Permit { gate: self, count })
	}

	fn release(&self, count: usize) {
		let mut state = self.state();
		state.available += count;
		debug_assert!(state.available <= self.capacity, "released more permits than acquired");
		drop(state);
		self.turn.notify_all();
	}

	fn state(&self) -> MutexGuard<'_, GateState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Permits held on a [`Gate`], released on drop
#[derive(Debug)]
#[must_use = "permits are released as soon as they are dropped"]
pub struct Permit<'gate> {
	gate: &'gate Gate,
	count: usize,
}

impl Permit<'_> {
	/// Number of permits held
	#[must_use]
	pub const fn count(&self) -> usize {
		self.count
	}

	/// Whether this holds every permit of its gate, shutting out everyone else
	#[must_use]
	pub const fn is_exclusive(&self) -> bool {
		self.count == self.gate.capacity
	}
}

impl Drop for Permit<'_> {
	fn drop(&mut self) {
		self.gate.release(self.count);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::{sync::Arc, thread};

	/// Spin until `condition` holds, the gate is only observable through polling
	fn wait_until(condition: impl Fn() -> bool) {
		let start = Instant::now();
		while !condition() {
			assert!(start.elapsed() < Duration::from_secs(5), "condition never held");
			thread::sleep(Duration::from_millis(1));
		}
	}

	#[test]
	fn readers_share_the_gate() {
		let gate = Gate::new(2);
		let first = gate.acquire();
		let second = gate.acquire();
		assert_eq!(gate.available(), 0);
		assert!(!first.is_exclusive());

		drop(first);
		drop(second);
		assert_eq!(gate.available(), 2);

		let all = gate.acquire_all();
		assert!(all.is_exclusive());
		assert_eq!(all.count(), 2);
	}

	#[test]
	fn exclusive_waiter_is_not_overtaken() {
		let gate = Arc::new(Gate::new(2));
		let reader = gate.acquire();

		let exclusive = thread::spawn({
			let gate = Arc::clone(&gate);
			move || {
				let _all = gate.acquire_all();
			}
		});
		wait_until(|| gate.waiting() == 1);

		// one permit is free, but the exclusive waiter came first
		assert_eq!(gate.available(), 1);
		assert!(gate.try_acquire_for(1, Duration::from_millis(50)).is_err());

		drop(reader);
		exclusive.join().expect("exclusive waiter panicked");
		assert_eq!(gate.available(), 2);
		assert_eq!(gate.waiting(), 0);
	}

	#[test]
	fn timed_out_waiter_leaves_the_queue() {
		let gate = Arc::new(Gate::new(1));
		let holder = gate.acquire();

		let timeout = gate.try_acquire_for(1, Duration::from_millis(20));
		assert!(matches!(timeout, Err(GateTimeout { requested: 1, .. })));
		assert_eq!(gate.waiting(), 0);

		let behind = thread::spawn({
			let gate = Arc::clone(&gate);
			move || gate.acquire().count()
		});
		drop(holder);
		assert_eq!(behind.join().expect("waiter panicked"), 1);
	}

	#[test]
	fn abandoned_ticket_in_the_middle_is_skipped() {
		let gate = Arc::new(Gate::new(1));
		let holder = gate.acquire();

		let first = thread::spawn({
			let gate = Arc::clone(&gate);
			move || gate.acquire().count()
		});
		wait_until(|| gate.waiting() == 1);

		// queued behind `first`, gives up while `first` still waits
		assert!(gate.try_acquire_for(1, Duration::from_millis(20)).is_err());

		let last = thread::spawn({
			let gate = Arc::clone(&gate);
			move || gate.acquire().count()
		});
		wait_until(|| gate.waiting() == 2);

		drop(holder);
		assert_eq!(first.join().expect("first waiter panicked"), 1);
		assert_eq!(last.join().expect("last waiter panicked"), 1);
		assert_eq!(gate.available(), 1);
	}
}
