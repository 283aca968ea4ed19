// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles.

pub mod mock_transport;

pub use mock_transport::MockTransport;
