//! Notice fingerprints

use crate::notice::Notice;
use sha1::{Digest, Sha1};
use std::fmt::{self, Debug, Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Callback computing a fingerprint from the in-progress notice
pub type FingerprintFn = dyn Fn(&Notice) -> Option<String> + Send + Sync;

/// Fingerprint source: a fixed value or a callback
#[derive(Clone)]
pub enum Fingerprint {
    /// Fixed value
    Static(String),
    /// Computed per notice
    Computed(Arc<FingerprintFn>),
}

impl Fingerprint {
    /// Fixed fingerprint from anything displayable
    pub fn fixed(value: impl Display) -> Self {
        Self::Static(value.to_string())
    }

    /// Fingerprint computed by `f`
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Notice) -> Option<String> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Raw (unhashed) fingerprint for `notice`
    ///
    /// A panicking callback yields `None`.
    #[must_use]
    pub fn resolve(&self, notice: &Notice) -> Option<String> {
        match self {
            Self::Static(value) => Some(value.clone()),
            Self::Computed(f) => catch_unwind(AssertUnwindSafe(|| f(notice))).unwrap_or_else(|_| {
                tracing::warn!(error_class = %notice.error_class, "fingerprint callback panicked");
                None
            }),
        }
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self::Static(value.to_string())
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

/// SHA-1 hex digest of `input`
#[must_use]
pub fn digest(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO_SHA1: &str = "0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33";

    #[test]
    fn digest_matches_known_value() {
        assert_eq!(digest("foo"), FOO_SHA1);
        assert_eq!(digest("foo").len(), 40);
    }

    #[test]
    fn fixed_from_display() {
        struct Token;
        impl Display for Token {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("foo")
            }
        }
        let fp = Fingerprint::fixed(Token);
        assert!(matches!(fp, Fingerprint::Static(ref s) if s == "foo"));
    }

    #[test]
    fn debug_hides_callbacks() {
        let fp = Fingerprint::computed(|_| None);
        assert_eq!(format!("{fp:?}"), "Computed(..)");
    }
}
