use crate::Slot;

/// The slice of the beacon state the subprotocol core reads.
///
/// The full state lives with the state-transition function; message handling
/// only ever inspects the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeaconState {
    pub slot: Slot,
}
