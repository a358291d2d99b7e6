use std::fmt;

/// One decoded `(command, data)` unit.
///
/// Packets are immutable once built: the framer creates them and the
/// dispatch loop consumes each one exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Packet {
    command: String,
    data: String,
}

impl Packet {
    /// Create a packet. `data` may be empty.
    pub fn new(command: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            data: data.into(),
        }
    }

    /// The command token, e.g. `GZ1`.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The command data. Empty when the sender had nothing to attach.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn into_parts(self) -> (String, String) {
        (self.command, self.data)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.command, self.data)
    }
}
