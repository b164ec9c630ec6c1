//! Command registry: the closed set of transport commands and their wire codes.
//!
//! Each code is the four ASCII bytes of the name read as a little-endian `u32`.
//! The codes are spelled out as constants rather than packed at runtime.

use crate::error::{ProtocolError, Result};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

pub const A_SYNC: u32 = 0x434e_5953;
pub const A_CNXN: u32 = 0x4e58_4e43;
pub const A_OPEN: u32 = 0x4e45_504f;
pub const A_OKAY: u32 = 0x5941_4b4f;
pub const A_CLSE: u32 = 0x4553_4c43;
pub const A_WRTE: u32 = 0x4554_5257;

/// A recognised transport command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    Sync = A_SYNC,
    Connect = A_CNXN,
    Open = A_OPEN,
    Okay = A_OKAY,
    Close = A_CLSE,
    Write = A_WRTE,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Sync,
        Command::Connect,
        Command::Open,
        Command::Okay,
        Command::Close,
        Command::Write,
    ];

    /// Wire code of this command.
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Four-letter wire name.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Sync => "SYNC",
            Command::Connect => "CNXN",
            Command::Open => "OPEN",
            Command::Okay => "OKAY",
            Command::Close => "CLSE",
            Command::Write => "WRTE",
        }
    }

    /// Look up a command by its four-letter name.
    ///
    /// # Errors
    /// Returns `ProtocolError::UnknownCommand` for names outside the table.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name() == name)
            .ok_or_else(|| ProtocolError::UnknownCommand(name.to_string()))
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.code() == code)
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render any wire code for diagnostics.
/// Known codes borrow their static name; anything else becomes `0x%08x`.
#[inline]
pub fn command_name(code: u32) -> Cow<'static, str> {
    match Command::from_code(code) {
        Some(cmd) => Cow::Borrowed(cmd.name()),
        None => Cow::Owned(format!("{code:#010x}")),
    }
}
