//! Thermostat zone command handling.

use hvaclink_frame::{encode_to_string, Delimiters};
use hvaclink_server::CommandProcessor;
use tracing::{debug, info, warn};

/// Zone 1 set temperature before anyone changes it.
pub const DEFAULT_SET_TEMPERATURE: i32 = 10;

/// Zone 2 room temperature reported until a reading arrives.
pub const DEFAULT_ZONE2_TEMPERATURE: i32 = 10;

/// State of a two-zone thermostat as the remote controller sees it.
///
/// | command | data            | response                    |
/// |---------|-----------------|-----------------------------|
/// | `GZ1`   | room temp (int) | `*GZ1\|<set temperature>\|&` |
/// | `GZ2`   | ignored         | `*GZ2\|<zone 2 temp>\|&`     |
/// | `DZ1`   | room temp       | none                        |
/// | `DZ2`   | room temp       | none                        |
/// | `DS1`   | set temp        | none                        |
///
/// `DZ*` and `DS1` accept a decimal reading and keep its integer part.
/// Unknown commands and unparsable readings get no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneController {
    zone1_room: Option<i32>,
    zone1_set: i32,
    zone2_room: i32,
    delimiters: Delimiters,
}

impl ZoneController {
    pub fn new() -> Self {
        Self::with_set_temperature(DEFAULT_SET_TEMPERATURE)
    }

    pub fn with_set_temperature(set_temperature: i32) -> Self {
        Self {
            zone1_room: None,
            zone1_set: set_temperature,
            zone2_room: DEFAULT_ZONE2_TEMPERATURE,
            delimiters: Delimiters::DEFAULT,
        }
    }

    /// Frame responses with `delimiters` instead of `* | &`.
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Last zone 1 room temperature reported by the controller.
    pub fn zone1_room_temperature(&self) -> Option<i32> {
        self.zone1_room
    }

    pub fn zone1_set_temperature(&self) -> i32 {
        self.zone1_set
    }

    pub fn zone2_room_temperature(&self) -> i32 {
        self.zone2_room
    }

    fn reply(&self, command: &str, value: i32) -> String {
        encode_to_string(command, &value.to_string(), &self.delimiters)
    }
}

impl Default for ZoneController {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandProcessor for ZoneController {
    fn handle(&mut self, command: &str, data: &str) -> String {
        match command {
            "GZ1" => match data.trim().parse::<i32>() {
                Ok(room) => {
                    self.zone1_room = Some(room);
                    info!(zone = 1, room, set = self.zone1_set, "room temperature");
                    self.reply("GZ1", self.zone1_set)
                }
                Err(err) => {
                    warn!(command, data, error = %err, "unparsable room temperature");
                    String::new()
                }
            },
            "GZ2" => self.reply("GZ2", self.zone2_room),
            "DZ1" | "DZ2" | "DS1" => {
                let Some(value) = whole_degrees(data) else {
                    warn!(command, data, "unparsable temperature reading");
                    return String::new();
                };
                match command {
                    "DZ1" => self.zone1_room = Some(value),
                    "DZ2" => self.zone2_room = value,
                    _ => self.zone1_set = value,
                }
                debug!(command, value, "display updated");
                String::new()
            }
            _ => {
                warn!(command, data, "unrecognised command");
                String::new()
            }
        }
    }
}

/// Integer part of a reading such as `21.5` or `-3`.
fn whole_degrees(data: &str) -> Option<i32> {
    let data = data.trim();
    let whole = data.split_once('.').map_or(data, |(whole, _)| whole);
    whole.parse().ok()
}
