use crate::{Identity, Password};
use sscp_crypto::{
    blinding_mask, h1, h2, h3, h4, h5, h6, CryptoError, GroupElement, SessionKey,
    SHORT_HASH_SIZE,
};
use zeroize::Zeroizing;

/// `initiator-id || responder-id || password`, the input to both blinding hashes.
pub(crate) struct Transcript(Zeroizing<Vec<u8>>);

impl Transcript {
    pub(crate) fn new(initiator: &Identity, responder: &Identity, password: &Password) -> Self {
        let mut bytes = Zeroizing::new(Vec::with_capacity(
            2 * initiator.as_bytes().len() + password.as_bytes().len(),
        ));
        bytes.extend_from_slice(initiator.as_bytes());
        bytes.extend_from_slice(responder.as_bytes());
        bytes.extend_from_slice(password.as_bytes());
        Self(bytes)
    }

    pub(crate) fn initiator_mask(&self) -> Result<GroupElement, CryptoError> {
        GroupElement::from_mask(blinding_mask(&h1(&self.0)))
    }

    pub(crate) fn responder_mask(&self) -> Result<GroupElement, CryptoError> {
        GroupElement::from_mask(blinding_mask(&h2(&self.0)))
    }

    /// Extends the transcript with both raw public values and the shared secret.
    pub(crate) fn session_material(
        &self,
        initiator_public: &GroupElement,
        responder_public: &GroupElement,
        shared: &GroupElement,
    ) -> SessionMaterial {
        let mut bytes = Zeroizing::new(self.0.to_vec());
        bytes.extend_from_slice(&initiator_public.to_bytes());
        bytes.extend_from_slice(&responder_public.to_bytes());
        let shared = Zeroizing::new(shared.to_bytes());
        bytes.extend_from_slice(&*shared);
        SessionMaterial(bytes)
    }
}

pub(crate) struct SessionMaterial(Zeroizing<Vec<u8>>);

impl SessionMaterial {
    /// `S1`, sent by the responder.
    pub(crate) fn responder_confirm(&self) -> Result<[u8; SHORT_HASH_SIZE], CryptoError> {
        h3(&self.0)
    }

    /// `S2`, sent by the initiator.
    pub(crate) fn initiator_confirm(&self) -> Result<[u8; SHORT_HASH_SIZE], CryptoError> {
        h4(&self.0)
    }

    /// Derives `(encK, macK)`.
    pub(crate) fn split(&self) -> Result<(SessionKey, SessionKey), CryptoError> {
        let mut enc = h5(&self.0)?;
        let mut mac = h6(&self.0)?;
        Ok((
            SessionKey::take(&mut enc, "encryption"),
            SessionKey::take(&mut mac, "authentication"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sscp_crypto::generate_keypair;

    fn transcript(password: &str) -> Transcript {
        Transcript::new(
            &Identity::new(b"client").unwrap(),
            &Identity::new(b"server").unwrap(),
            &Password::new(password).unwrap(),
        )
    }

    #[test]
    fn layout() {
        let t = transcript("password");
        assert_eq!(t.0.len(), 16 + 16 + 8);
        assert_eq!(&t.0[..6], b"client");
        assert_eq!(&t.0[16..22], b"server");
        assert_eq!(&t.0[32..], b"password");
    }

    #[test]
    fn masks_differ_per_direction_and_password() {
        let t = transcript("password");
        assert_ne!(t.initiator_mask().unwrap(), t.responder_mask().unwrap());
        assert_ne!(
            t.initiator_mask().unwrap(),
            transcript("Password").initiator_mask().unwrap()
        );
    }

    #[test]
    fn derived_values_are_distinct() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        let shared = a.pow_priv(b.public());
        let material = transcript("password").session_material(a.public(), b.public(), &shared);
        assert_eq!(material.0.len(), 40 + 3 * 384);

        let s1 = material.responder_confirm().unwrap();
        let s2 = material.initiator_confirm().unwrap();
        assert_ne!(s1, s2);
        let (enc, mac) = material.split().unwrap();
        assert_ne!(enc, mac);
        assert!(format!("{:?}", enc).contains("encryption"));
        enc.with(|k| assert_ne!(k, &s1));
    }
}
