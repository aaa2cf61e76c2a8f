//! Operations handed to the record-level operate call.

use sha2::{Digest, Sha256};

use crate::model::ParticleType;

/// Operation kinds produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    CdtRead,
    CdtModify,
    ExpRead,
    ExpModify,
}

impl OperationType {
    /// Returns the protocol code for this operation type.
    pub fn protocol_type(self) -> u8 {
        match self {
            OperationType::CdtRead => 3,
            OperationType::CdtModify => 4,
            OperationType::ExpRead => 7,
            OperationType::ExpModify => 8,
        }
    }

    /// Returns true if the operation can change the record.
    pub fn is_write(self) -> bool {
        matches!(self, OperationType::CdtModify | OperationType::ExpModify)
    }
}

/// A single operation against one bin.
///
/// Built once and never mutated, so it is safe to resend on retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    /// Bin the operation targets.
    pub bin_name: String,
    /// Operation kind.
    pub op_type: OperationType,
    /// Packed operation payload.
    pub payload: Vec<u8>,
}

impl Operation {
    /// Particle type of the payload as sent on the wire.
    pub fn particle_type(&self) -> ParticleType {
        ParticleType::Blob
    }

    /// SHA-256 over the protocol type, bin name and payload.
    ///
    /// Equal operations always have equal fingerprints, so the value can key a
    /// cache of prepared requests.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update([self.op_type.protocol_type()]);
        hasher.update((self.bin_name.len() as u32).to_be_bytes());
        hasher.update(self.bin_name.as_bytes());
        hasher.update(&self.payload);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(bin: &str, op_type: OperationType, payload: &[u8]) -> Operation {
        Operation {
            bin_name: bin.to_string(),
            op_type,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn test_protocol_types() {
        assert_eq!(OperationType::CdtRead.protocol_type(), 3);
        assert_eq!(OperationType::CdtModify.protocol_type(), 4);
        assert!(OperationType::CdtModify.is_write());
        assert!(!OperationType::ExpRead.is_write());
    }

    #[test]
    fn test_fingerprint_distinguishes_fields() {
        let base = op("bin", OperationType::CdtRead, &[1, 2, 3]);
        assert_eq!(base.fingerprint(), base.clone().fingerprint());
        assert_ne!(base.fingerprint(), op("bin", OperationType::CdtModify, &[1, 2, 3]).fingerprint());
        assert_ne!(base.fingerprint(), op("bin2", OperationType::CdtRead, &[1, 2, 3]).fingerprint());
        // Length prefix keeps the bin/payload boundary unambiguous.
        assert_ne!(
            op("ab", OperationType::CdtRead, &[0x63]).fingerprint(),
            op("abc", OperationType::CdtRead, &[]).fingerprint()
        );
    }
}
