use std::net::SocketAddr;

use thiserror::Error;

/// Raised while reading the hardware address from configuration. Always fatal at startup,
/// so the process never runs with a zeroed-out address.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MacParseError {
    #[error("expected 6 colon-separated groups in MAC address `{input}`, got {found}")]
    GroupCount { input: String, found: usize },

    #[error("MAC address group `{group}` must be exactly two hex digits")]
    GroupLength { group: String },

    #[error("MAC address group `{group}` is not valid hex")]
    InvalidHex { group: String },
}

/// The wake datagram did not leave this machine. Never retried; the user may re-issue the command.
#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("failed to open a UDP socket for the wake packet")]
    Bind { source: std::io::Error },

    #[error("failed to enable broadcast on the wake socket")]
    Broadcast { source: std::io::Error },

    #[error("failed to send the wake packet to {dest}")]
    Send {
        dest: SocketAddr,
        source: std::io::Error,
    },

    #[error("only {written} of {expected} wake packet bytes were sent to {dest}")]
    ShortWrite {
        dest: SocketAddr,
        written: usize,
        expected: usize,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("monitoring already in progress ({elapsed_secs}s elapsed)")]
    AlreadyMonitoring { elapsed_secs: u64 },
}
