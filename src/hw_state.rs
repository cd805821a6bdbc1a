// src/hw_state.rs
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwState {
    Off,
    On,
    EnableDiscovery,
    DisableDiscovery,
}

/// What entering a state asks of the outside world. The radio driver
/// calls are fire-and-forget; completion is never validated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEffect {
    PowerOff,
    StartPoll,
    StopPoll,
    EnabledEvent,
    DisabledEvent,
}

/// The single process-wide radio power/discovery state. Mutated only
/// through `request`; re-requesting the held state is a no-op no matter
/// which trigger path asked for it, so repeated toggle or lock events
/// act as implicit retries.
#[derive(Debug)]
pub struct HardwareStateMachine {
    state: HwState,
}

impl HardwareStateMachine {
    pub fn new() -> HardwareStateMachine {
        HardwareStateMachine {
            state: HwState::Off,
        }
    }

    pub fn state(&self) -> HwState {
        self.state
    }

    pub fn request(&mut self, target: HwState) -> Vec<HwEffect> {
        if target == self.state {
            return Vec::new();
        }

        info!("NFC hardware state {:?} -> {:?}", self.state, target);
        self.state = target;

        match target {
            HwState::Off => vec![HwEffect::PowerOff, HwEffect::DisabledEvent],
            HwState::On => vec![HwEffect::StartPoll, HwEffect::EnabledEvent],
            HwState::EnableDiscovery => vec![HwEffect::StartPoll],
            HwState::DisableDiscovery => vec![HwEffect::StopPoll],
        }
    }
}

impl Default for HardwareStateMachine {
    fn default() -> Self {
        HardwareStateMachine::new()
    }
}
