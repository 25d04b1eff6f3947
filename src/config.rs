// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and fixed tunables used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for local persistence (history db, audit log) | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `NETWORK_URL` | Base URL of the threshold network coordinator | Required |
//! | `NETWORK_NAME` | Network identifier sent in the connect handshake | `datil-test` |
//! | `SIGNER_KEY` | Hex-encoded service signing key | One of the two required |
//! | `SIGNER_KEY_PATH` | Path to a PEM-encoded service signing key | One of the two required |
//! | `CAPACITY_TOKEN_ID` | Pre-minted capacity credential token id | Optional (minted lazily) |
//! | `CHAIN_RPC_URL` | EVM RPC endpoint for the local policy preflight | Optional (preflight off) |
//! | `TLS_CERT_PATH` | TLS certificate chain (PEM) | Optional (plain HTTP) |
//! | `TLS_KEY_PATH` | TLS private key (PEM) | Optional (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

/// Environment variable name for the local data directory.
///
/// The history database and audit logs live here. Must be writable by the
/// service user.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Environment variable for the threshold network coordinator base URL.
pub const NETWORK_URL_ENV: &str = "NETWORK_URL";

/// Environment variable for the network identifier.
pub const NETWORK_NAME_ENV: &str = "NETWORK_NAME";

/// Default network identifier.
pub const DEFAULT_NETWORK_NAME: &str = "datil-test";

/// Environment variable holding the hex-encoded service signing key.
pub const SIGNER_KEY_ENV: &str = "SIGNER_KEY";

/// Environment variable naming a PEM file with the service signing key.
pub const SIGNER_KEY_PATH_ENV: &str = "SIGNER_KEY_PATH";

/// Environment variable for a pre-minted capacity credential.
///
/// When set, the capacity manager never mints; it reuses this token id.
pub const CAPACITY_TOKEN_ID_ENV: &str = "CAPACITY_TOKEN_ID";

/// Environment variable for the EVM RPC endpoint used by the policy
/// preflight. Preflight is disabled when unset.
pub const CHAIN_RPC_URL_ENV: &str = "CHAIN_RPC_URL";

/// Environment variables for the TLS certificate chain and key. The server
/// falls back to plain HTTP when either is unset.
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

// =============================================================================
// Fixed tunables
// =============================================================================

/// Validity window of a session authorization, in seconds (10 minutes).
pub const SESSION_TTL_SECS: i64 = 600;

/// Capacity of the in-process session-authorization cache.
pub const SESSION_CACHE_CAPACITY: usize = 32;

/// Capacity mint parameter: sustained request rate.
pub const MINT_REQUESTS_PER_KILOSECOND: u64 = 10;

/// Capacity mint parameter: days until the credit expires (UTC midnight).
pub const MINT_EXPIRATION_DAYS: u64 = 1;

/// Bounded retry for the network connect handshake: attempt count.
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Bounded retry for the network connect handshake: base backoff step.
pub const CONNECT_BACKOFF_MS: u64 = 250;

/// Timeout applied to every HTTP call against the threshold network.
pub const NETWORK_HTTP_TIMEOUT_SECS: u64 = 30;
