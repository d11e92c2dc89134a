use std::cell::RefCell;
use std::rc::Rc;

use super::types::MovementMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementEvent {
    ModeChanged {
        old: MovementMode,
        new: MovementMode,
    },
    MovementEnded,
}

/// Receives notifications synchronously from inside `GridMovement::advance`.
pub trait MovementObserver {
    fn on_movement_mode_changed(&mut self, _old: MovementMode, _new: MovementMode) {}

    fn on_movement_ended(&mut self) {}
}

/// Clonable recorder: hand one clone to the movement component, read the other.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<MovementEvent>>>,
}

impl EventLog {
    pub fn snapshot(&self) -> Vec<MovementEvent> {
        self.events.borrow().clone()
    }

    pub fn drain(&self) -> Vec<MovementEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn ended_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, MovementEvent::MovementEnded))
            .count()
    }

    pub fn mode_changes(&self) -> Vec<(MovementMode, MovementMode)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MovementEvent::ModeChanged { old, new } => Some((*old, *new)),
                MovementEvent::MovementEnded => None,
            })
            .collect()
    }

    fn push(&self, event: MovementEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl MovementObserver for EventLog {
    fn on_movement_mode_changed(&mut self, old: MovementMode, new: MovementMode) {
        self.push(MovementEvent::ModeChanged { old, new });
    }

    fn on_movement_ended(&mut self) {
        self.push(MovementEvent::MovementEnded);
    }
}
