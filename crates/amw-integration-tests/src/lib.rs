// SPDX-License-Identifier: BUSL-1.1
//! Host crate for the cross-crate integration test suite under `tests/`.
