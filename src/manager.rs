// src/manager.rs
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::decoder;
use crate::hw_state::{HardwareStateMachine, HwEffect, HwState};
use crate::types::{
    DiscoveryMessage, DriverCall, IncomingMessage, OutgoingMessage, VIBRATION_PATTERN,
};

pub const TECH_P2P: &str = "P2P";
pub const TECH_NDEF: &str = "NDEF";
pub const TECH_NDEF_WRITEABLE: &str = "NDEF_WRITEABLE";
pub const TECH_NDEF_FORMATABLE: &str = "NDEF_FORMATABLE";
pub const TECH_UNKNOWN: &str = "Unknown";

pub const ACTIVITY_TAG_DISCOVERED: &str = "nfc-tag-discovered";

// Highest priority first; unrecognized tags rank below all of these.
const TECH_PRIORITY: [&str; 4] = [
    TECH_P2P,
    TECH_NDEF,
    TECH_NDEF_WRITEABLE,
    TECH_NDEF_FORMATABLE,
];

/// Picks the single governing technology for one discovery. The list
/// order is as reported by the radio, so ties of equal priority keep
/// the first occurrence.
pub fn prioritized_tech(tech_list: &[String]) -> String {
    let rank = |tech: &str| {
        TECH_PRIORITY
            .iter()
            .position(|known| *known == tech)
            .unwrap_or(TECH_PRIORITY.len())
    };

    tech_list
        .iter()
        .min_by_key(|tech| rank(tech))
        .cloned()
        .unwrap_or_else(|| TECH_UNKNOWN.to_string())
}

pub fn run(tx: Sender<OutgoingMessage>, rx: Receiver<IncomingMessage>) {
    info!("Starting NFC manager (event driven)...");

    let mut manager = NfcManager::new(tx);
    while let Ok(msg) = rx.recv() {
        manager.handle(msg);
    }
}

/// Owns all mutable gateway state. Messages are handled strictly in
/// arrival order on one thread; none of the decode paths suspend.
pub struct NfcManager {
    hw: HardwareStateMachine,
    screen_locked: bool,
    p2p_request_pending: bool,
    p2p_ack_armed: bool,
    tx: Sender<OutgoingMessage>,
}

impl NfcManager {
    pub fn new(tx: Sender<OutgoingMessage>) -> NfcManager {
        NfcManager {
            hw: HardwareStateMachine::new(),
            screen_locked: false,
            p2p_request_pending: false,
            p2p_ack_armed: false,
            tx,
        }
    }

    pub fn handle(&mut self, msg: IncomingMessage) {
        match msg {
            IncomingMessage::TechDiscovered(msg) => self.handle_tech_discovered(&msg),
            IncomingMessage::TechLost(_) => self.handle_tech_lost(),
            IncomingMessage::SettingsChanged { enabled } => self.handle_settings_changed(enabled),
            IncomingMessage::LockscreenOpened => {
                self.screen_locked = true;
                self.handle_screen_event();
            }
            IncomingMessage::LockscreenClosed => {
                self.screen_locked = false;
                self.handle_screen_event();
            }
            IncomingMessage::ScreenChange => self.handle_screen_event(),
            IncomingMessage::ShrinkingSent => self.handle_shrinking_sent(),
            IncomingMessage::CheckP2pRegistration { manifest_url } => {
                self.check_p2p_registration(manifest_url)
            }
            IncomingMessage::P2pRegistrationResult { allowed } => {
                self.handle_p2p_registration_result(allowed)
            }
        }
    }

    fn send(&self, msg: OutgoingMessage) {
        let _ = self.tx.send(msg);
    }

    fn event(&self, name: &str) {
        self.send(OutgoingMessage::PlatformEvent {
            name: name.to_string(),
        });
    }

    /// A shapeless techList normalizes to the empty list; anything that
    /// is not a string inside the list is skipped.
    fn tech_strings(tech_list: &Value) -> Vec<String> {
        tech_list
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn handle_tech_discovered(&mut self, msg: &DiscoveryMessage) {
        debug!("tech discovered, session {:?}", msg.session_token);

        // Side effects first, even for malformed input: vibration, the
        // generic discovery event, the handover forward.
        self.send(OutgoingMessage::Vibrate {
            pattern: VIBRATION_PATTERN.to_vec(),
        });
        self.event("nfc-tech-discovered");
        self.send(OutgoingMessage::TryHandover {
            records: msg.records.clone(),
            session_token: msg.session_token.clone(),
        });

        let tech_list = Self::tech_strings(&msg.tech_list);
        if tech_list.iter().any(|tech| tech == TECH_P2P) {
            // the registration check runs concurrently with decoding;
            // its result never gates the action below
            self.event("check-p2p-registration-for-active-app");
        }

        let tech = prioritized_tech(&tech_list);
        match tech.as_str() {
            TECH_P2P => {
                if !msg.records.is_empty() {
                    self.fire_ndef_discovered(msg, &tech, &tech_list);
                }
            }
            TECH_NDEF | TECH_NDEF_WRITEABLE => self.fire_ndef_discovered(msg, &tech, &tech_list),
            _ => self.fire_tag_discovered(msg, &tech, &tech_list),
        }
    }

    fn fire_ndef_discovered(&self, msg: &DiscoveryMessage, tech: &str, tech_list: &[String]) {
        let mut options = decoder::handle_ndef_message(&msg.records);
        options.data.insert("tech".to_string(), json!(tech));
        options.data.insert("techList".to_string(), json!(tech_list));
        if let Some(token) = &msg.session_token {
            options.data.insert("sessionToken".to_string(), json!(token));
        }

        self.send(OutgoingMessage::Activity {
            name: options.name,
            data: Value::Object(options.data),
        });
    }

    /// Non-NDEF technologies skip record decoding entirely.
    fn fire_tag_discovered(&self, msg: &DiscoveryMessage, tech: &str, tech_list: &[String]) {
        let mut data = serde_json::Map::new();
        data.insert("type".to_string(), json!(tech));
        data.insert("techList".to_string(), json!(tech_list));
        if let Some(token) = &msg.session_token {
            data.insert("sessionToken".to_string(), json!(token));
        }
        data.insert(
            "records".to_string(),
            serde_json::to_value(&msg.records).unwrap_or_default(),
        );

        self.send(OutgoingMessage::Activity {
            name: ACTIVITY_TAG_DISCOVERED.to_string(),
            data: Value::Object(data),
        });
    }

    fn handle_tech_lost(&mut self) {
        debug!("tech lost");
        self.event("nfc-tech-lost");
        // the acknowledgement listener dies with the session
        self.p2p_ack_armed = false;
        self.event("shrinking-stop");
    }

    // --- P2P registration round trip -----------------------------------

    fn check_p2p_registration(&mut self, manifest_url: String) {
        if self.p2p_request_pending {
            warn!("P2P registration check already in flight, dropping request");
            return;
        }
        self.p2p_request_pending = true;
        self.send(OutgoingMessage::CheckP2pRegistration { manifest_url });
    }

    fn handle_p2p_registration_result(&mut self, allowed: bool) {
        if !self.p2p_request_pending {
            return;
        }
        self.p2p_request_pending = false;

        if allowed {
            self.event("shrinking-start");
            self.p2p_ack_armed = true;
        } else {
            self.p2p_ack_armed = false;
            self.event("shrinking-stop");
        }
    }

    /// One-shot acknowledgement from the sharing UI: disarmed before it
    /// fires, so it can never fire twice per registration.
    fn handle_shrinking_sent(&mut self) {
        if !self.p2p_ack_armed {
            return;
        }
        self.p2p_ack_armed = false;
        self.event("dispatch-p2p-user-response-on-active-app");
        self.event("shrinking-stop");
    }

    // --- hardware state triggers ---------------------------------------

    fn handle_settings_changed(&mut self, enabled: bool) {
        let target = if !enabled {
            HwState::Off
        } else if self.screen_locked {
            HwState::DisableDiscovery
        } else {
            HwState::On
        };
        self.apply_hw(target);
    }

    fn handle_screen_event(&mut self) {
        let target = match self.hw.state() {
            HwState::Off => return,
            HwState::On if self.screen_locked => HwState::DisableDiscovery,
            HwState::DisableDiscovery | HwState::EnableDiscovery if !self.screen_locked => {
                HwState::EnableDiscovery
            }
            _ => return,
        };
        self.apply_hw(target);
    }

    fn apply_hw(&mut self, target: HwState) {
        for effect in self.hw.request(target) {
            match effect {
                HwEffect::PowerOff => self.send(OutgoingMessage::Driver {
                    call: DriverCall::PowerOff,
                }),
                HwEffect::StartPoll => self.send(OutgoingMessage::Driver {
                    call: DriverCall::StartPoll,
                }),
                HwEffect::StopPoll => self.send(OutgoingMessage::Driver {
                    call: DriverCall::StopPoll,
                }),
                HwEffect::EnabledEvent => self.event("nfc-enabled"),
                HwEffect::DisabledEvent => self.event("nfc-disabled"),
            }
        }
    }
}
