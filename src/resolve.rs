//! Caller context and the injected resolver.

use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use crate::error::DialError;

/// Cancellation handle for one dial.
///
/// Only the resolution step observes it; an in-flight connect runs to its
/// own per-attempt deadline. Clones share the cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct DialContext {
	cancelled: Arc<AtomicBool>,
	deadline: Option<Instant>,
}

impl DialContext {
	/// A context that is never cancelled on its own.
	pub fn background() -> Self {
		Self::default()
	}

	/// A context that expires `timeout` from now.
	pub fn with_timeout(timeout: Duration) -> Self {
		Self {
			cancelled: Arc::default(),
			deadline: Some(Instant::now() + timeout),
		}
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);
	}

	/// True once cancelled or past the deadline.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Acquire)
			|| self.deadline.is_some_and(|d| Instant::now() >= d)
	}

	/// `Err(DialError::Cancelled)` once the context is done.
	pub fn check(&self) -> Result<(), DialError> {
		if self.is_cancelled() {
			Err(DialError::Cancelled)
		} else {
			Ok(())
		}
	}
}

/// Resolves a domain to candidate addresses, in preference order.
pub trait Resolver: Send + Sync {
	fn resolve(&self, ctx: &DialContext, domain: &str) -> std::io::Result<Vec<IpAddr>>;
}

impl<F> Resolver for F
where
	F: Fn(&DialContext, &str) -> std::io::Result<Vec<IpAddr>> + Send + Sync,
{
	fn resolve(&self, ctx: &DialContext, domain: &str) -> std::io::Result<Vec<IpAddr>> {
		self(ctx, domain)
	}
}

/// Resolves through the platform resolver (`getaddrinfo`).
///
/// Duplicate addresses are dropped, first occurrence wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
	fn resolve(&self, ctx: &DialContext, domain: &str) -> std::io::Result<Vec<IpAddr>> {
		if ctx.is_cancelled() {
			return Err(std::io::Error::new(std::io::ErrorKind::Interrupted, "context cancelled"));
		}
		let mut ips: Vec<IpAddr> = Vec::new();
		for addr in (domain, 0).to_socket_addrs()? {
			if !ips.contains(&addr.ip()) {
				ips.push(addr.ip());
			}
		}
		Ok(ips)
	}
}
