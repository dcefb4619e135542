pub const SEQUENCE_SIZE: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SequenceError {
    #[error("sequence space exhausted")]
    Exhausted,
    #[error("sequence mismatch, expected {expected}, got {received}")]
    Mismatch { expected: u32, received: u32 },
}

/// Per-direction packet counter. Starts at 0 and moves forward by exactly one per packet.
/// `u32::MAX` is never issued: reaching it ends the session.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SequenceCounter(u32);

impl SequenceCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// Returns the next value to use or expect.
    pub fn counter_num(&self) -> u32 {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; SEQUENCE_SIZE] {
        self.0.to_be_bytes()
    }

    /// Returns `Err(Exhausted)` once the counter can no longer move forward.
    pub fn needs_rotation(&self) -> Result<(), SequenceError> {
        if self.0 == u32::MAX {
            Err(SequenceError::Exhausted)?
        }
        Ok(())
    }

    /// Hands out the current value for an outbound packet and moves to the next one.
    pub fn take_next(&mut self) -> Result<u32, SequenceError> {
        self.needs_rotation()?;
        let current = self.0;
        self.0 += 1;
        Ok(current)
    }

    /// Accepts `received` only when it is exactly the expected value, then moves forward.
    pub fn accept_next(&mut self, received: u32) -> Result<(), SequenceError> {
        if received != self.0 {
            Err(SequenceError::Mismatch {
                expected: self.0,
                received,
            })?
        }
        self.take_next().map(|_| ())
    }
}
