//! SOFT/HARD state machine
//!
//! ```text
//! new state == confirmed (last HARD) state:
//!     attempt = 1, HARD
//!
//! new state != confirmed state:
//!     item was HARD, or new state != current SOFT state  → attempt = 1
//!     otherwise                                           → attempt += 1
//!
//!     attempt >= max_check_attempts → HARD (confirmed, notification eligible)
//!     attempt <  max_check_attempts → SOFT
//! ```
//!
//! A SOFT episode only confirms once the same state was reported
//! `max_check_attempts` times in a row.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::item::{Item, StateType, Transition};
use crate::item::State;

/// Apply `state` to `item` and report what happened
pub fn apply(item: &mut Item, state: State, at: DateTime<Utc>) -> Transition {
    let previous = item.state;
    let previous_type = item.state_type;
    let mut hard_change = false;

    if state == item.last_hard_state {
        item.attempt_count = 1;
        item.state_type = StateType::Hard;
    } else {
        let restart = previous_type == StateType::Hard || state != previous;
        item.attempt_count = if restart {
            1
        } else {
            item.attempt_count.saturating_add(1)
        };

        if item.attempt_count >= item.max_check_attempts {
            item.state_type = StateType::Hard;
            item.last_hard_state = state;
            item.last_hard_state_change = Some(at);
            hard_change = true;
        } else {
            item.state_type = StateType::Soft;
        }
    }

    item.last_state = previous;
    item.state = state;
    if previous != state {
        item.last_state_change = Some(at);
    }

    trace!(
        "{}: {previous}/{previous_type} -> {state}/{} (attempt {}/{})",
        item.name, item.state_type, item.attempt_count, item.max_check_attempts
    );

    Transition {
        previous,
        previous_type,
        state,
        state_type: item.state_type,
        attempt: item.attempt_count,
        hard_change,
    }
}
