use std::cell::RefCell;
use std::rc::Rc;

use crate::math::Transform;

/// Per-frame displacement ("root motion") reported by an animation system.
pub trait AnimationSource {
    /// Displacement accumulated for the current frame, identity when nothing is pending.
    /// Draining resets the source so the same motion is never handed out twice.
    fn drain_frame_displacement(&mut self) -> Transform;
}

/// Animation source fed by hand. Pushes within a frame add up; a drain hands the sum out and
/// clears it. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct DisplacementFeed {
    frame: Rc<RefCell<Transform>>,
}

impl DisplacementFeed {
    pub fn push(&self, displacement: Transform) {
        let mut frame = self.frame.borrow_mut();
        *frame = Transform::new(
            frame.location + displacement.location,
            frame.rotation + displacement.rotation,
        );
    }

    pub fn is_pending(&self) -> bool {
        !self.frame.borrow().is_identity()
    }
}

impl AnimationSource for DisplacementFeed {
    fn drain_frame_displacement(&mut self) -> Transform {
        std::mem::replace(&mut *self.frame.borrow_mut(), Transform::IDENTITY)
    }
}
