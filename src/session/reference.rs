//! Variables reference encoding of a (frame, scope) pair.
//!
//! The reference is `frame * 10 + kind`. The scope kind always occupies the
//! last decimal digit, so every non-negative frame index round-trips.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReferenceError {
    #[error("invalid variables reference {0}")]
    Invalid(i64),
    #[error("frame index {0} is too large for a variables reference")]
    Overflow(usize),
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Local = 1,
    Global = 2,
}

impl TryFrom<u8> for ScopeKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ScopeKind::Local),
            2 => Ok(ScopeKind::Global),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeReference {
    /// View-relative frame index.
    pub frame: usize,
    pub kind: ScopeKind,
}

impl ScopeReference {
    pub fn new(frame: usize, kind: ScopeKind) -> Self {
        Self { frame, kind }
    }

    pub fn encode(self) -> Result<i64, ReferenceError> {
        i64::try_from(self.frame)
            .ok()
            .and_then(|frame| frame.checked_mul(10))
            .and_then(|base| base.checked_add(self.kind as i64))
            .ok_or(ReferenceError::Overflow(self.frame))
    }

    pub fn decode(reference: i64) -> Result<Self, ReferenceError> {
        if reference < 0 {
            return Err(ReferenceError::Invalid(reference));
        }
        let kind = u8::try_from(reference % 10)
            .ok()
            .and_then(|k| ScopeKind::try_from(k).ok())
            .ok_or(ReferenceError::Invalid(reference))?;
        let frame = usize::try_from(reference / 10).map_err(|_| ReferenceError::Invalid(reference))?;
        Ok(Self { frame, kind })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        for frame in 0..10 {
            for kind in [ScopeKind::Local, ScopeKind::Global] {
                let reference = ScopeReference::new(frame, kind);
                let encoded = reference.encode().unwrap();
                assert_eq!(ScopeReference::decode(encoded).unwrap(), reference);
            }
        }
    }

    #[test]
    fn test_encoding() {
        assert_eq!(ScopeReference::new(0, ScopeKind::Local).encode(), Ok(1));
        assert_eq!(ScopeReference::new(3, ScopeKind::Global).encode(), Ok(32));
        // wider than one digit still round-trips
        let deep = ScopeReference::new(123, ScopeKind::Global);
        assert_eq!(deep.encode(), Ok(1232));
        assert_eq!(ScopeReference::decode(1232), Ok(deep));
    }

    #[test]
    fn test_invalid_references() {
        for reference in [0, 3, 10, 19, -1, -12] {
            assert_eq!(
                ScopeReference::decode(reference),
                Err(ReferenceError::Invalid(reference)),
                "reference {reference}"
            );
        }
        assert_eq!(
            ScopeReference::new(usize::MAX, ScopeKind::Local).encode(),
            Err(ReferenceError::Overflow(usize::MAX))
        );
    }
}
