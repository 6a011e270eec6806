//! The render state stack.

use crate::dimension::Dimension;
use crate::renderer::RenderState;

/// A stack of render states. The top is the state shapes are drawn with; it is never empty.
#[derive(Clone, Debug)]
pub struct StateStack<D: Dimension> {
    states: Vec<RenderState<D>>,
}

impl<D: Dimension> Default for StateStack<D> {
    fn default() -> Self {
        Self {
            states: vec![RenderState::default()],
        }
    }
}

impl<D: Dimension> StateStack<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves a copy of the current state.
    pub fn push(&mut self) {
        let top = *self.current();
        self.states.push(top);
    }

    /// Restores the state saved by the matching [`StateStack::push`].
    ///
    /// Returns `false`, leaving the stack untouched, when there is nothing to pop.
    pub fn pop(&mut self) -> bool {
        if self.states.len() == 1 {
            log::warn!("render state stack underflow, pop ignored");
            return false;
        }
        self.states.pop();
        true
    }

    pub fn current(&self) -> &RenderState<D> {
        // The base state is never popped.
        &self.states[self.states.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut RenderState<D> {
        let top = self.states.len() - 1;
        &mut self.states[top]
    }

    /// Applies `transform` in the current local frame.
    pub fn transform(&mut self, transform: D::Transform) {
        let state = self.current_mut();
        state.transform = state.transform * transform;
    }

    pub fn translate(&mut self, translation: D::Vector) {
        self.transform(D::from_translation(translation));
    }

    pub fn scale(&mut self, scale: D::Vector) {
        self.transform(D::from_scale(scale));
    }

    pub fn rotate(&mut self, rotation: D::Rotation) {
        self.transform(D::from_rotation(rotation));
    }

    /// Replaces the current transform. The axes are kept.
    pub fn set_transform(&mut self, transform: D::Transform) {
        self.current_mut().transform = transform;
    }

    /// Applies `axes` to the current coordinate system.
    ///
    /// Axes sit outside the transform, so they survive [`StateStack::set_transform`] and
    /// also move the lights.
    pub fn transform_axes(&mut self, axes: D::Transform) {
        let state = self.current_mut();
        state.axes = state.axes * axes;
    }

    pub fn translate_axes(&mut self, translation: D::Vector) {
        self.transform_axes(D::from_translation(translation));
    }

    pub fn scale_axes(&mut self, scale: D::Vector) {
        self.transform_axes(D::from_scale(scale));
    }

    pub fn rotate_axes(&mut self, rotation: D::Rotation) {
        self.transform_axes(D::from_rotation(rotation));
    }

    /// Number of pushes not matched by a pop.
    pub fn depth(&self) -> usize {
        self.states.len() - 1
    }

    /// Back to a single default state.
    ///
    /// Returns `false` when pushes were left unmatched.
    pub fn reset(&mut self) -> bool {
        let balanced = self.depth() == 0;
        if !balanced {
            log::warn!(
                "{} render state push(es) left unmatched at the end of the frame",
                self.depth()
            );
        }
        self.states.truncate(1);
        self.states[0] = RenderState::default();
        balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;
    use crate::dimension::{D2, D3};
    use glamx::{Quat, Vec2, Vec3};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_push_pop_restores_state() {
        let mut stack = StateStack::<D2>::new();
        stack.current_mut().fill_color = color::RED;

        stack.push();
        stack.current_mut().fill_color = color::BLUE;
        stack.current_mut().outline = true;
        assert_eq!(stack.depth(), 1);

        assert!(stack.pop());
        assert_eq!(stack.current().fill_color, color::RED);
        assert!(!stack.current().outline);
    }

    #[test]
    fn test_pop_never_empties_the_stack() {
        let mut stack = StateStack::<D2>::new();
        assert!(!stack.pop());
        assert_eq!(stack.depth(), 0);
        assert_eq!(*stack.current(), RenderState::default());
    }

    #[test]
    fn test_reset_reports_unbalanced_pushes() {
        let mut stack = StateStack::<D2>::new();
        stack.current_mut().outline_width = 0.5;
        assert!(stack.reset());
        assert_eq!(stack.current().outline_width, 0.1);

        stack.push();
        stack.push();
        assert!(!stack.reset());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_transforms_compose_in_the_local_frame() {
        let mut stack = StateStack::<D2>::new();
        stack.translate(Vec2::new(2.0, 0.0));
        stack.rotate(FRAC_PI_2);
        stack.translate(Vec2::new(1.0, 0.0));

        // The last translation follows the rotated X axis.
        let origin = stack.current().transform.transform_point2(Vec2::ZERO);
        assert!(origin.abs_diff_eq(Vec2::new(2.0, 1.0), 1.0e-6));

        stack.push();
        stack.scale(Vec2::splat(3.0));
        assert!(stack.pop());
        let unit = stack.current().transform.transform_vector2(Vec2::X);
        assert!(unit.abs_diff_eq(Vec2::Y, 1.0e-6));
    }

    #[test]
    fn test_axes_survive_set_transform() {
        let mut stack = StateStack::<D3>::new();
        stack.translate_axes(Vec3::new(0.0, 5.0, 0.0));
        stack.rotate_axes(Quat::from_rotation_z(FRAC_PI_2));
        stack.translate(Vec3::new(1.0, 0.0, 0.0));

        let state = *stack.current();
        let origin = state.world(&D3::identity()).transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 6.0, 0.0), 1.0e-6));

        stack.set_transform(D3::identity());
        let origin = stack
            .current()
            .world(&D3::identity())
            .transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 5.0, 0.0), 1.0e-6));

        stack.scale_axes(Vec3::splat(2.0));
        assert!(stack.reset());
        assert_eq!(stack.current().axes, D3::identity());
    }
}
