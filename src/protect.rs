//! The protection capability.
//!
//! A protector marks a descriptor so the OS routes its traffic outside the
//! tunnel. On Android this is `VpnService.protect`; elsewhere it may be a
//! routing mark or nothing at all. The dialer only sees the boolean result.

use std::os::fd::RawFd;

/// Excludes a socket from the tunnel.
///
/// Called once per created descriptor, possibly from many threads at once.
/// Returning `false` fails that dial attempt and the descriptor is closed.
pub trait Protector: Send + Sync {
	fn protect(&self, fd: RawFd) -> bool;
}

/// Always succeeds. For setups where nothing needs protecting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProtector;

impl Protector for NoopProtector {
	#[inline]
	fn protect(&self, _fd: RawFd) -> bool {
		true
	}
}

impl<F> Protector for F
where
	F: Fn(RawFd) -> bool + Send + Sync,
{
	fn protect(&self, fd: RawFd) -> bool {
		self(fd)
	}
}
