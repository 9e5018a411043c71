use std::borrow::{Borrow, Cow};
use std::hash::{Hash, Hasher};

use bytes::Bytes;

/// A cheaply clonable, immutable utf-8 string backed by [`Bytes`].
///
/// Namespace paths and event names are copied into every connection view and
/// every outgoing frame; sharing one allocation keeps those copies free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Str(Bytes);

impl Str {
    /// Copy an arbitrary `&str` into a new shared allocation.
    pub fn copy_from_slice(s: &str) -> Self {
        Str(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Return a `&str` view of the string.
    pub fn as_str(&self) -> &str {
        // SAFETY: Str is only ever built from valid utf-8
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }
}

impl std::ops::Deref for Str {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl Borrow<str> for Str {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

// Must agree with the `Borrow<str>` impl above, so hash as a str rather
// than as raw bytes.
impl Hash for Str {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl std::fmt::Display for Str {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for Str {
    fn from(s: &'static str) -> Self {
        Str(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Str {
    fn from(s: String) -> Self {
        Str(Bytes::from(s.into_bytes()))
    }
}

impl From<Cow<'static, str>> for Str {
    fn from(s: Cow<'static, str>) -> Self {
        match s {
            Cow::Borrowed(s) => Str::from(s),
            Cow::Owned(s) => Str::from(s),
        }
    }
}

impl From<Str> for String {
    fn from(s: Str) -> Self {
        let vec: Vec<u8> = s.0.into();
        // SAFETY: Str is only ever built from valid utf-8
        unsafe { String::from_utf8_unchecked(vec) }
    }
}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<Str> for &str {
    fn eq(&self, other: &Str) -> bool {
        *self == other.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::Str;
    use std::collections::HashMap;

    #[test]
    fn lookup_by_borrowed_str() {
        let mut map = HashMap::new();
        map.insert(Str::from("/chat"), 1);
        assert_eq!(map.get("/chat"), Some(&1));
        assert_eq!(map.get(""), None);
    }

    #[test]
    fn conversions_round_trip() {
        let s = Str::from(String::from("room:1"));
        assert_eq!(s, "room:1");
        assert_eq!(String::from(s), "room:1");
    }
}
