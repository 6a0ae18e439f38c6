// Commands module - user-initiated operations
// Every mutation here ends in exactly one toast

pub mod board;
pub mod card;
pub mod cleanup;
pub mod common;
pub mod folder;
pub mod snippet;
