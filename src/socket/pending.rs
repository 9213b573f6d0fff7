use std::net::SocketAddr;
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Instant;
use tracing::trace;
use crate::error::{SocketError, errno};
use super::options;

/// A non-blocking connect that has been issued but may not have completed.
#[derive(Debug)]
pub struct PendingConnect {
	fd: OwnedFd,
	addr: SocketAddr,
	done: bool,
}

impl PendingConnect {
	pub(crate) fn in_progress(fd: OwnedFd, addr: SocketAddr) -> Self {
		Self { fd, addr, done: false }
	}

	pub(crate) fn connected(fd: OwnedFd, addr: SocketAddr) -> Self {
		Self { fd, addr, done: true }
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	/// Reads and clears the socket error status.
	///
	/// Returns `None` if no error (connect succeeded).
	/// Reading clears the error, so only call once.
	pub fn take_error(&self) -> std::io::Result<Option<std::io::Error>> {
		options::take_error(&self.fd)
	}

	/// Waits for the connection to complete, up to `deadline`.
	///
	/// Consumes self. Returns the connected descriptor, or an error after
	/// closing it. Expiry is reported as `ETIMEDOUT` for the target address.
	pub fn wait(self, deadline: Instant) -> std::io::Result<OwnedFd> {
		if self.done {
			return Ok(self.fd);
		}

		loop {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				trace!(addr = %self.addr, "connect deadline reached");
				return Err(SocketError::Connect { errno: libc::ETIMEDOUT, addr: self.addr }.into());
			}
			// Round up so a sub-millisecond remainder does not spin.
			let timeout_ms = remaining.as_millis().clamp(1, libc::c_int::MAX as u128) as libc::c_int;

			let mut pfd = libc::pollfd {
				fd: self.as_raw_fd(),
				events: libc::POLLOUT,
				revents: 0,
			};
			let n = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };

			match n {
				-1 => {
					let e = errno();
					if e == libc::EINTR {
						continue;
					}
					return Err(SocketError::Poll { errno: e }.into());
				}
				0 => continue,
				_ => break,
			}
		}

		match self.take_error()? {
			None => Ok(self.fd),
			Some(err) => {
				let errno = err.raw_os_error().unwrap_or(libc::ECONNREFUSED);
				Err(SocketError::Connect { errno, addr: self.addr }.into())
			}
		}
	}
}
/*
  ┌───────────────────────────┬─────────────────────────────────────────────┐
  │ poll() result             │ Meaning                                     │
  ├───────────────────────────┼─────────────────────────────────────────────┤
  │ -1 / EINTR                │ signal arrived, retry with what time is left│
  ├───────────────────────────┼─────────────────────────────────────────────┤
  │ 0                         │ nothing yet, loop re-checks the deadline    │
  ├───────────────────────────┼─────────────────────────────────────────────┤
  │ > 0 (POLLOUT/ERR/HUP)     │ connect finished, SO_ERROR says how         │
  └───────────────────────────┴─────────────────────────────────────────────┘
 */

impl std::os::fd::AsRawFd for PendingConnect {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for PendingConnect {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}
