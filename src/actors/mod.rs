//! Actor layer around the scheduling engine
//!
//! The engine itself is synchronous. This module runs it as an independent
//! async task and connects it to the outside world through Tokio channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!   stdin / workers / tests
//!            │ SchedulerHandle (mpsc)
//!            ▼
//!   ┌──────────────────┐   CheckJob    ┌──────────────────┐
//!   │  SchedulerActor  │ ────────────▶ │  CheckExecutor   │
//!   │  (owns engine)   │ ◀──────────── │  (launch only)   │
//!   └────────┬─────────┘ launch errors └──────────────────┘
//!            │ EngineEvent
//!            ▼
//!   Broadcast Channel (MPMC) → [subscribers]
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the actor has an mpsc command channel for control messages
//! 2. **Events**: the actor publishes events to a broadcast channel for fan-out
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod executor;
pub mod messages;
pub mod scheduler;
