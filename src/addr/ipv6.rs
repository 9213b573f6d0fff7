use std::net::{Ipv6Addr, SocketAddrV6};
use crate::addr::ToSockAddr;

/// Converts to the raw sockaddr_in6 for syscalls.
///
/// Flow info and scope id are carried through; both are 0 for addresses
/// that came out of a resolver.
pub(crate) fn to_raw(addr: &SocketAddrV6) -> libc::sockaddr_in6 {
	let mut raw: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
	raw.sin6_family = libc::AF_INET6 as libc::sa_family_t;
	raw.sin6_port = addr.port().to_be();
	raw.sin6_flowinfo = addr.flowinfo();
	raw.sin6_addr = libc::in6_addr {
		s6_addr: addr.ip().octets(),
	};
	raw.sin6_scope_id = addr.scope_id();
	raw
}

/// Creates from raw sockaddr_in6.
pub(crate) fn from_raw(raw: &libc::sockaddr_in6) -> SocketAddrV6 {
	SocketAddrV6::new(
		Ipv6Addr::from(raw.sin6_addr.s6_addr),
		u16::from_be(raw.sin6_port),
		raw.sin6_flowinfo,
		raw.sin6_scope_id,
	)
}

impl ToSockAddr for SocketAddrV6 {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = to_raw(self);
		let ptr = &raw as *const _ as *const libc::sockaddr;
		let len = std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
		f(ptr, len)
	}
}
