use crate::{ct_eq, KEY_SIZE};
use std::fmt;
use zeroize::Zeroize;

/// A 128-bit session key. The bytes are only reachable through [`SessionKey::with`]
/// and are wiped when the key is dropped.
#[derive(Clone)]
pub struct SessionKey {
    inner: [u8; KEY_SIZE],
    tag: &'static str,
}

impl SessionKey {
    pub fn new(mut inner: [u8; KEY_SIZE], tag: &'static str) -> Self {
        Self::take(&mut inner, tag)
    }

    /// Copies `inner` into the key and zeroes the source.
    pub fn take(inner: &mut [u8; KEY_SIZE], tag: &'static str) -> Self {
        let key = Self {
            inner: *inner,
            tag,
        };
        inner.zeroize();
        key
    }

    pub fn with<R>(&self, f: impl FnOnce(&[u8; KEY_SIZE]) -> R) -> R {
        f(&self.inner)
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        ct_eq(&self.inner, &other.inner)
    }
}

impl Eq for SessionKey {}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_wipes_source() {
        let mut source = [7u8; KEY_SIZE];
        let key = SessionKey::take(&mut source, "test");
        assert_eq!(source, [0u8; KEY_SIZE]);
        assert_eq!(key.with(|k| *k), [7u8; KEY_SIZE]);
    }

    #[test]
    fn debug_hides_bytes() {
        let key = SessionKey::new([0xab; KEY_SIZE], "enc");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("171"));
        assert!(!debug.contains("ab"));
        assert!(debug.contains("enc"));
    }

    #[test]
    fn equality() {
        let a = SessionKey::new([1; KEY_SIZE], "a");
        let b = SessionKey::new([1; KEY_SIZE], "b");
        let c = SessionKey::new([2; KEY_SIZE], "a");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
