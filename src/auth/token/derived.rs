//! The derived (Spartan) credential: bearer capability and store key in one value.

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

/// Final artifact of the delegation chain.
///
/// The value is both the bearer used against the downstream API and the key under which the
/// broker files the matching refresh record and pending profile. Whoever holds it can
/// authenticate and redeem the one-time profile, so formatters never print it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivedCredential(String);
impl DerivedCredential {
	/// Wraps a credential value returned by the provider or presented by a caller.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw bearer value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the provider or caller supplied an empty value.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Borrow<str> for DerivedCredential {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<&str> for DerivedCredential {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for DerivedCredential {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for DerivedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("DerivedCredential").field(&"<redacted>").finish()
	}
}
impl Display for DerivedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
