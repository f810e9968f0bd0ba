//! Log-based state observer.
//!
//! Registers a logging callback for every controller state, so a headless
//! deployment still narrates pours to the console. A presentation layer
//! would register its own callbacks instead — each state carries a single
//! callback slot, and registration replaces what was there.

use log::{debug, info};

use crate::bartender::{Bartender, BartenderEvent, BartenderState};
use crate::ports::DispensePort;

/// Attach log lines to all six states.
pub fn attach<D: DispensePort>(bartender: &Bartender<D>) {
    bartender.on_transition(BartenderState::Idle, |_| {
        info!("STATE | idle, ready to make drinks");
    });
    bartender.on_transition(BartenderState::Making, |_| {
        info!("STATE | making your drink");
    });
    bartender.on_transition(BartenderState::Pouring, |event| {
        if let BartenderEvent::PourStarted {
            component,
            index,
            total,
        } = event
        {
            info!("STATE | pouring {} ({}/{})", component, index + 1, total);
        }
    });
    bartender.on_transition(BartenderState::PouringProgress, |event| {
        if let BartenderEvent::PourProgress { done_ml, target_ml } = event {
            debug!("STATE | poured {done_ml:.0}/{target_ml:.0} mL");
        }
    });
    bartender.on_transition(BartenderState::Ready, |_| {
        info!("STATE | drink ready, take your glass");
    });
    bartender.on_transition(BartenderState::Aborted, |event| match event {
        BartenderEvent::Fault { fault } => {
            info!("STATE | pour failed ({fault}), dump the glass");
        }
        _ => info!("STATE | pour aborted, dump the glass"),
    });
}
