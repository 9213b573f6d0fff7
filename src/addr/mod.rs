//! Address families and raw sockaddr conversion.
//!
//! The dialer works with `std::net` addresses; this module turns them into
//! the `sockaddr_in` / `sockaddr_in6` structures the syscalls expect and back.

mod ipv4;
mod ipv6;

use std::net::{IpAddr, SocketAddr};

/// Address family of a candidate socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
	Ipv4,
	Ipv6,
}

impl Family {
	/// Picks the family from the address length: 4 bytes is IPv4, anything else IPv6.
	pub fn of(ip: &IpAddr) -> Self {
		match ip {
			IpAddr::V4(_) => Family::Ipv4,
			IpAddr::V6(_) => Family::Ipv6,
		}
	}

	/// Returns the libc constant for this address family.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Family::Ipv4 => libc::AF_INET,
			Family::Ipv6 => libc::AF_INET6,
		}
	}
}

/// Trait for address types that can be converted to raw sockaddr for syscalls.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}
/*
sockaddr_in and sockaddr_in6 are different sizes and live on the stack of
with_raw(). The closure runs while that struct is still alive, so the
pointer handed to bind()/connect() never dangles.
 */

impl ToSockAddr for SocketAddr {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		match self {
			SocketAddr::V4(addr) => addr.with_raw(f),
			SocketAddr::V6(addr) => addr.with_raw(f),
		}
	}
}

/// Reads a `std::net::SocketAddr` back out of a `sockaddr_storage`.
///
/// Returns `None` for families other than `AF_INET`/`AF_INET6` or a short length.
pub(crate) fn from_storage(storage: &libc::sockaddr_storage, len: libc::socklen_t) -> Option<SocketAddr> {
	let ptr = storage as *const libc::sockaddr_storage as *const libc::sockaddr;
	match storage.ss_family as libc::c_int {
		libc::AF_INET => {
			if (len as usize) < std::mem::size_of::<libc::sockaddr_in>() {
				return None;
			}
			let raw = unsafe { &*(ptr as *const libc::sockaddr_in) };
			Some(SocketAddr::V4(ipv4::from_raw(raw)))
		}
		libc::AF_INET6 => {
			if (len as usize) < std::mem::size_of::<libc::sockaddr_in6>() {
				return None;
			}
			let raw = unsafe { &*(ptr as *const libc::sockaddr_in6) };
			Some(SocketAddr::V6(ipv6::from_raw(raw)))
		}
		_ => None,
	}
}
