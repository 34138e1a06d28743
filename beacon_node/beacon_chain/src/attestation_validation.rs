use types::Slot;

/// Reasons an attestation is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The attestation's inclusion delay has not elapsed yet.
    FutureSlot {
        attestation_slot: Slot,
        state_slot: Slot,
    },
    /// The attestation is more than an epoch old and can no longer be
    /// included.
    PastSlot {
        attestation_slot: Slot,
        state_slot: Slot,
    },
    /// The attestation failed full consensus validation.
    Invalid(String),
}

/// Checks that an attestation from `attestation_slot` is includable in a
/// block built on a state at `state_slot`.
///
/// The window is `attestation_slot + min_attestation_inclusion_delay <=
/// state_slot <= attestation_slot + slots_per_epoch`.
pub fn validate_attestation_slot(
    attestation_slot: Slot,
    state_slot: Slot,
    slots_per_epoch: u64,
    min_attestation_inclusion_delay: u64,
) -> Result<(), Error> {
    if attestation_slot + min_attestation_inclusion_delay > state_slot {
        return Err(Error::FutureSlot {
            attestation_slot,
            state_slot,
        });
    }
    if attestation_slot + slots_per_epoch < state_slot {
        return Err(Error::PastSlot {
            attestation_slot,
            state_slot,
        });
    }
    Ok(())
}
