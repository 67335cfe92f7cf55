// SPDX-License-Identifier: Apache-2.0
//! Board exchange I/O.

#[cfg(feature = "serde")]
pub mod board_format;
