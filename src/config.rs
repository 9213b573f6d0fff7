use std::net::IpAddr;
use std::time::Duration;

/// How resolved IPv6 candidates are treated.
///
/// Filtering never reorders the resolver's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ipv6Mode {
	/// Drop IPv6 candidates.
	Disable,
	/// Keep every candidate.
	#[default]
	Enable,
	/// Keep every candidate; ordering is left to the resolver.
	Prefer,
	/// Drop IPv4 candidates.
	Only,
}

impl Ipv6Mode {
	/// Maps the numeric mode used by mobile bindings (0..=3).
	pub fn from_i32(mode: i32) -> Option<Self> {
		match mode {
			0 => Some(Ipv6Mode::Disable),
			1 => Some(Ipv6Mode::Enable),
			2 => Some(Ipv6Mode::Prefer),
			3 => Some(Ipv6Mode::Only),
			_ => None,
		}
	}

	pub fn allows(self, ip: &IpAddr) -> bool {
		match self {
			Ipv6Mode::Disable => ip.is_ipv4(),
			Ipv6Mode::Only => ip.is_ipv6(),
			Ipv6Mode::Enable | Ipv6Mode::Prefer => true,
		}
	}
}

/// Dialer settings, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialerConfig {
	/// Bound on one protect→configure→connect sequence, from socket creation.
	pub attempt_timeout: Duration,
	pub ipv6_mode: Ipv6Mode,
}

impl Default for DialerConfig {
	fn default() -> Self {
		Self {
			attempt_timeout: Duration::from_secs(10),
			ipv6_mode: Ipv6Mode::default(),
		}
	}
}

impl DialerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
		self.attempt_timeout = timeout;
		self
	}

	pub fn ipv6_mode(mut self, mode: Ipv6Mode) -> Self {
		self.ipv6_mode = mode;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = DialerConfig::new();
		assert_eq!(config.attempt_timeout, Duration::from_secs(10));
		assert_eq!(config.ipv6_mode, Ipv6Mode::Enable);
	}

	#[test]
	fn mode_filters_by_family() {
		let v4: IpAddr = "10.0.0.1".parse().unwrap();
		let v6: IpAddr = "2001:db8::1".parse().unwrap();

		assert!(Ipv6Mode::Disable.allows(&v4) && !Ipv6Mode::Disable.allows(&v6));
		assert!(!Ipv6Mode::Only.allows(&v4) && Ipv6Mode::Only.allows(&v6));
		assert!(Ipv6Mode::Prefer.allows(&v4) && Ipv6Mode::Prefer.allows(&v6));
		assert_eq!(Ipv6Mode::from_i32(3), Some(Ipv6Mode::Only));
		assert_eq!(Ipv6Mode::from_i32(9), None);
	}
}
