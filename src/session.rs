//! Pool of session identifiers handed to dictionary suggestion queries

use std::{
	fmt,
	sync::{Mutex, MutexGuard, PoisonError},
};

/// Opaque token a dictionary may use to pick per-thread scratch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(usize);

impl SessionId {
	/// Identifier for a raw index
	#[must_use]
	pub const fn new(index: usize) -> Self {
		Self(index)
	}

	/// Index of this identifier in its pool, starting at zero
	#[must_use]
	pub const fn index(self) -> usize {
		self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "session#{}", self.0)
	}
}

/// Fixed set of [`SessionId`]s, lent out one at a time
///
/// The pool is sized to the gate capacity, so a caller holding a gate permit
/// always finds an identifier.
#[derive(Debug)]
pub struct SessionPool {
	/// Identifiers not lent out
	idle: Mutex<Vec<SessionId>>,
	/// Number of identifiers the pool was created with
	size: usize,
}

impl SessionPool {
	/// Pool holding identifiers `0..size`
	#[must_use]
	pub fn new(size: usize) -> Self {
		Self {
			idle: Mutex::new((0..size).rev().map(SessionId).collect()),
			size,
		}
	}

	/// Borrow an identifier until the returned lease is dropped
	///
	/// Returns [`None`] when every identifier is lent out.
	pub fn lease(&self) -> Option<SessionLease<'_>> {
		let id = self.idle().pop()?;
		Some(SessionLease { pool: self, id })
	}

	/// Number of identifiers currently available
	pub fn available(&self) -> usize {
		self.idle().len()
	}

	/// Number of identifiers the pool owns
	#[must_use]
	pub const fn size(&self) -> usize {
		self.size
	}

	fn give_back(&self, id: SessionId) {
		let mut idle = self.idle();
		debug_assert!(!idle.contains(&id), "{id} was returned twice");
		idle.push(id);
	}

	fn idle(&self) -> MutexGuard<'_, Vec<SessionId>> {
		self.idle.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// A borrowed [`SessionId`], returned to its pool on drop
#[derive(Debug)]
pub struct SessionLease<'pool> {
	pool: &'pool SessionPool,
	id: SessionId,
}

impl SessionLease<'_> {
	/// The borrowed identifier
	#[must_use]
	pub const fn id(&self) -> SessionId {
		self.id
	}
}

impl Drop for SessionLease<'_> {
	fn drop(&mut self) {
		self.pool.give_back(self.id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lends_every_identifier_once() {
		let pool = SessionPool::new(2);

		let first = pool.lease().expect("pool has two identifiers");
		let second = pool.lease().expect("pool has two identifiers");
		assert_ne!(first.id(), second.id());
		assert!(pool.lease().is_none());
		assert_eq!(pool.available(), 0);

		drop(first);
		assert_eq!(pool.available(), 1);
		drop(second);
		assert_eq!(pool.available(), pool.size());
	}

	#[test]
	fn returns_identifier_on_unwind() {
		let pool = SessionPool::new(1);

		let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
			let _lease = pool.lease().expect("pool has one identifier");
			panic!("query failed");
		}));

		assert!(result.is_err());
		assert_eq!(pool.available(), 1);
	}
}
