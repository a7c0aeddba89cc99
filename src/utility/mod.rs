// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Small helpers shared by the server, the simulator and the client tool.

pub mod word_order;

pub use word_order::{merge_i32, split_i32};
