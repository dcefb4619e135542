use crate::{
    handshake::transcript::{SessionMaterial, Transcript},
    BlindedPublic, BlindedPublicAndConfirm, ClientHello, Confirm, CryptoFailureReason, Identity,
    Password, ProtocolError, ServerHello, SessionError, PROTOCOL_VERSION, STATUS_ACCEPTED,
    STATUS_VERSION_MISMATCH,
};
use sscp_crypto::{ct_eq, div_mod, mul_mod, GroupElement, KeyPair, SessionKey, ELEMENT_SIZE};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HandshakeStage {
    Start,
    HelloSent,
    HelloReceived,
    BlindedExchange,
    Confirmed,
    Established,
    Failed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Everything a channel needs once both confirmations have been checked.
#[derive(Debug)]
pub struct HandshakeResult {
    pub local_identity: Identity,
    pub peer_identity: Identity,
    pub role: Role,
    pub encryption_key: SessionKey,
    pub authentication_key: SessionKey,
}

fn expect_stage(current: HandshakeStage, expected: HandshakeStage) -> Result<(), SessionError> {
    if current != expected {
        Err(ProtocolError::OutOfOrder(current))?
    }
    Ok(())
}

/// Moves the handshake to `Failed` on any error, so a failed attempt can never be resumed.
fn settle<T>(
    stage: &mut HandshakeStage,
    result: Result<T, SessionError>,
) -> Result<T, SessionError> {
    if result.is_err() {
        *stage = HandshakeStage::Failed;
    }
    result
}

/// Decodes a blinded value and strips the password mask from it.
fn unblind(
    element: &[u8; ELEMENT_SIZE],
    mask: &GroupElement,
) -> Result<GroupElement, SessionError> {
    let blinded = GroupElement::from_bytes(element)?;
    let raw = div_mod(&blinded, mask)?;
    if raw.is_degenerate() {
        Err(SessionError::crypto(CryptoFailureReason::DegenerateElement))?
    }
    Ok(raw)
}

fn shared_secret(key_pair: KeyPair, peer: &GroupElement) -> Result<GroupElement, SessionError> {
    let shared = key_pair.pow_priv(peer);
    // the private exponent is wiped here
    drop(key_pair);
    if shared.is_degenerate() {
        Err(SessionError::crypto(CryptoFailureReason::DegenerateElement))?
    }
    Ok(shared)
}

fn check_confirm(expected: &[u8], received: &[u8]) -> Result<(), SessionError> {
    if !ct_eq(expected, received) {
        Err(SessionError::crypto(CryptoFailureReason::ConfirmationMismatch))?
    }
    Ok(())
}

/// The connecting side. Sends `ClientHello`, `BlindedPublic` and `Confirm`.
pub struct Initiator {
    identity: Identity,
    password: Password,
    stage: HandshakeStage,
    peer_identity: Option<Identity>,
    transcript: Option<Transcript>,
    key_pair: Option<KeyPair>,
}

impl Initiator {
    pub fn new(identity: Identity, password: Password) -> Self {
        Self {
            identity,
            password,
            stage: HandshakeStage::Start,
            peer_identity: None,
            transcript: None,
            key_pair: None,
        }
    }

    pub fn stage(&self) -> HandshakeStage {
        self.stage
    }

    pub fn client_hello(&mut self) -> Result<ClientHello, SessionError> {
        let result = expect_stage(self.stage, HandshakeStage::Start).map(|_| ClientHello {
            version: PROTOCOL_VERSION,
            identity: self.identity,
        });
        let hello = settle(&mut self.stage, result)?;
        self.stage = HandshakeStage::HelloSent;
        Ok(hello)
    }

    /// Checks the responder's status and produces `X = g^a * H1(t) mod P`.
    pub fn read_server_hello(
        &mut self,
        hello: &ServerHello,
    ) -> Result<BlindedPublic, SessionError> {
        let result = self.blind(hello);
        settle(&mut self.stage, result)
    }

    fn blind(&mut self, hello: &ServerHello) -> Result<BlindedPublic, SessionError> {
        expect_stage(self.stage, HandshakeStage::HelloSent)?;
        if !hello.is_accepted() {
            Err(ProtocolError::Rejected(hello.status))?
        }

        let transcript = Transcript::new(&self.identity, &hello.identity, &self.password);
        let key_pair = KeyPair::generate()?;
        let blinded = mul_mod(key_pair.public(), &transcript.initiator_mask()?);

        self.peer_identity = Some(hello.identity);
        self.transcript = Some(transcript);
        self.key_pair = Some(key_pair);
        self.stage = HandshakeStage::BlindedExchange;
        Ok(BlindedPublic {
            element: blinded.to_bytes(),
        })
    }

    /// Verifies `S1` and, only if it matches, answers with `S2` and the session keys.
    pub fn read_blinded_confirm(
        &mut self,
        message: &BlindedPublicAndConfirm,
    ) -> Result<(Confirm, HandshakeResult), SessionError> {
        let result = self.confirm(message);
        settle(&mut self.stage, result)
    }

    fn confirm(
        &mut self,
        message: &BlindedPublicAndConfirm,
    ) -> Result<(Confirm, HandshakeResult), SessionError> {
        expect_stage(self.stage, HandshakeStage::BlindedExchange)?;
        let (Some(transcript), Some(key_pair), Some(peer_identity)) =
            (self.transcript.take(), self.key_pair.take(), self.peer_identity)
        else {
            return Err(ProtocolError::OutOfOrder(self.stage).into());
        };

        let responder_public = unblind(&message.element, &transcript.responder_mask()?)?;
        let initiator_public = key_pair.public().clone();
        let shared = shared_secret(key_pair, &responder_public)?;
        let material = transcript.session_material(&initiator_public, &responder_public, &shared);

        check_confirm(&material.responder_confirm()?, &message.confirm)?;
        self.stage = HandshakeStage::Confirmed;

        let confirm = Confirm {
            confirm: material.initiator_confirm()?,
        };
        let (encryption_key, authentication_key) = material.split()?;
        self.stage = HandshakeStage::Established;
        Ok((
            confirm,
            HandshakeResult {
                local_identity: self.identity,
                peer_identity,
                role: Role::Initiator,
                encryption_key,
                authentication_key,
            },
        ))
    }
}

/// The accepting side. Answers with `ServerHello` and `BlindedPublicAndConfirm`, then
/// checks the initiator's `Confirm`.
pub struct Responder {
    identity: Identity,
    password: Password,
    stage: HandshakeStage,
    peer_identity: Option<Identity>,
    transcript: Option<Transcript>,
    material: Option<SessionMaterial>,
}

impl Responder {
    pub fn new(identity: Identity, password: Password) -> Self {
        Self {
            identity,
            password,
            stage: HandshakeStage::Start,
            peer_identity: None,
            transcript: None,
            material: None,
        }
    }

    pub fn stage(&self) -> HandshakeStage {
        self.stage
    }

    pub fn peer_identity(&self) -> Option<Identity> {
        self.peer_identity
    }

    /// Always produces a reply. On a version mismatch the reply carries
    /// `STATUS_VERSION_MISMATCH` and the handshake is already `Failed`.
    pub fn read_client_hello(&mut self, hello: &ClientHello) -> Result<ServerHello, SessionError> {
        let result = expect_stage(self.stage, HandshakeStage::Start);
        settle(&mut self.stage, result)?;
        self.peer_identity = Some(hello.identity);

        if hello.version != PROTOCOL_VERSION {
            self.stage = HandshakeStage::Failed;
            return Ok(ServerHello {
                status: STATUS_VERSION_MISMATCH,
                identity: self.identity,
            });
        }

        self.transcript = Some(Transcript::new(&hello.identity, &self.identity, &self.password));
        self.stage = HandshakeStage::HelloReceived;
        Ok(ServerHello {
            status: STATUS_ACCEPTED,
            identity: self.identity,
        })
    }

    /// Recovers the initiator's public value, answers with `Y = g^b * H2(t) mod P` and `S1`.
    pub fn read_blinded_public(
        &mut self,
        message: &BlindedPublic,
    ) -> Result<BlindedPublicAndConfirm, SessionError> {
        let result = self.respond(message);
        settle(&mut self.stage, result)
    }

    fn respond(
        &mut self,
        message: &BlindedPublic,
    ) -> Result<BlindedPublicAndConfirm, SessionError> {
        expect_stage(self.stage, HandshakeStage::HelloReceived)?;
        let Some(transcript) = self.transcript.take() else {
            return Err(ProtocolError::OutOfOrder(self.stage).into());
        };

        let initiator_public = unblind(&message.element, &transcript.initiator_mask()?)?;
        let key_pair = KeyPair::generate()?;
        let responder_public = key_pair.public().clone();
        let blinded = mul_mod(&responder_public, &transcript.responder_mask()?);
        let shared = shared_secret(key_pair, &initiator_public)?;
        let material = transcript.session_material(&initiator_public, &responder_public, &shared);

        let confirm = material.responder_confirm()?;
        self.material = Some(material);
        self.stage = HandshakeStage::BlindedExchange;
        Ok(BlindedPublicAndConfirm {
            element: blinded.to_bytes(),
            confirm,
        })
    }

    /// Verifies `S2` and derives the session keys.
    pub fn read_confirm(&mut self, message: &Confirm) -> Result<HandshakeResult, SessionError> {
        let result = self.finish(message);
        settle(&mut self.stage, result)
    }

    fn finish(&mut self, message: &Confirm) -> Result<HandshakeResult, SessionError> {
        expect_stage(self.stage, HandshakeStage::BlindedExchange)?;
        let (Some(material), Some(peer_identity)) = (self.material.take(), self.peer_identity)
        else {
            return Err(ProtocolError::OutOfOrder(self.stage).into());
        };

        check_confirm(&material.initiator_confirm()?, &message.confirm)?;
        self.stage = HandshakeStage::Confirmed;

        let (encryption_key, authentication_key) = material.split()?;
        self.stage = HandshakeStage::Established;
        Ok(HandshakeResult {
            local_identity: self.identity,
            peer_identity,
            role: Role::Responder,
            encryption_key,
            authentication_key,
        })
    }
}
