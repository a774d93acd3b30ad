// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Themis Core - Compliance Check Service
//!
//! This crate provides the server side of Themis: it accepts check-run
//! triggers from CI, executes compliance analysis in the background, and
//! serves status, feed and dashboard queries. All run state is persisted so
//! polling survives restarts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     External Clients                        │
//! │              (themis-client: CI gate, CLI, bots)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ HTTP/JSON
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       themis-core                           │
//! │   (This Crate)  Trigger / Status / Feed / Bulk delete       │
//! └─────────────────────────────────────────────────────────────┘
//!           │                                  │
//!           │ CAS claim + terminal writes      │ Analyzer trait
//!           ▼                                  ▼
//! ┌───────────────────────┐        ┌───────────────────────────┐
//! │  PostgreSQL / SQLite  │        │    Compliance analysis    │
//! │   (check_runs table)  │        │     (LLM-backed)          │
//! └───────────────────────┘        └───────────────────────────┘
//! ```
//!
//! # Check run lifecycle
//!
//! | From | To | Guard |
//! |------|----|----|
//! | `pending` | `in_progress` | CAS claim, exactly one winner |
//! | `in_progress` | `completed` | analysis returned issues |
//! | `in_progress` | `failed` | analysis errored |
//!
//! Terminal states are written atomically together with `completed_at` and
//! the result payload; a run never sits in a terminal status without its
//! timestamp.
//!
//! # HTTP Operations
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | `POST /checks` | Trigger a run, returns the id immediately |
//! | `GET /checks/{id}` | Poll one run's status and summary |
//! | `GET /checks/completed?since=` | Completed feed, newest first |
//! | `DELETE /checks/bulk-delete` | Remove runs by id |
//! | `GET /stats` | Dashboard status counts (cached) |
//! | `GET /health` | Liveness, unauthenticated |

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod server;
pub mod session;
pub mod store;
pub mod tags;
pub mod worker;
