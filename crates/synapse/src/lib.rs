// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Synapse message bus: subject/body/priority/thread fan-out to
//! in-process subscribers and one external delivery channel.

mod bus;
mod channel;
mod message;

pub use bus::{Synapse, SynapseError};
pub use channel::{ChannelError, ExternalChannel, NoOpChannel};
pub use message::{Priority, SynapseMessage};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeChannel;
