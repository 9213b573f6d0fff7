use std::net::{Ipv4Addr, SocketAddrV4};
use crate::addr::ToSockAddr;

/// Converts to the raw sockaddr_in for syscalls.
pub(crate) fn to_raw(addr: &SocketAddrV4) -> libc::sockaddr_in {
	let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
	raw.sin_family = libc::AF_INET as libc::sa_family_t;
	raw.sin_port = addr.port().to_be();
	raw.sin_addr = libc::in_addr {
		s_addr: u32::from_ne_bytes(addr.ip().octets()),
	};
	raw
}

/// Creates from raw sockaddr_in.
pub(crate) fn from_raw(raw: &libc::sockaddr_in) -> SocketAddrV4 {
	SocketAddrV4::new(
		Ipv4Addr::from(raw.sin_addr.s_addr.to_ne_bytes()),
		u16::from_be(raw.sin_port),
	)
}

impl ToSockAddr for SocketAddrV4 {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = to_raw(self);
		let ptr = &raw as *const _ as *const libc::sockaddr;
		let len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
		f(ptr, len)
	}
}

/*
  - sin_family: AF_INET
  - sin_port: port in network byte order (big-endian)
  - sin_addr: the 4 address bytes, already in network order in memory
  - sin_zero: padding, left zeroed
 */
