// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding wire frames.
///
/// All of these are handled locally by dropping the offending frame;
/// none are fatal to the process.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("frame too short: need {need} bytes, got {got}")]
    FrameTooShort { need: usize, got: usize },

    #[error("frame too long: {len} bytes exceeds the {max} byte radio limit")]
    FrameTooLong { len: usize, max: usize },

    #[error("unknown op code 0x{0:02x}")]
    UnknownOp(u8),

    #[error("malformed node config: {0}")]
    MalformedConfig(String),

    #[error("encapsulation exceeds {0} hops")]
    TooManyHops(usize),
}
