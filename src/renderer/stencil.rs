//! Stencil-based outline compositing.
//!
//! Outlines are drawn with four pipeline variants per shape kind. A shape that has an
//! outline first marks its silhouette in the stencil buffer (with or without color), then a
//! scaled-up copy is drawn where the stencil test fails, which leaves only the border.
//! Shapes without an outline go through [`StencilPass::NoStencilWriteDoFill`] so they never
//! mask the outline of a shape drawn later.

use crate::color::{self, pack_color, Color};
use crate::dimension::Dimension;
use crate::error::{OnyxError, Result};
use crate::renderer::instance::{InstanceExtra, Material, NO_TEXTURE};

/// Stencil reference written by the stencil-write passes and tested by the outline pass.
pub const STENCIL_REFERENCE: u32 = 1;

/// The four pipeline variants of every shape kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StencilPass {
    /// Plain fill, no stencil interaction.
    NoStencilWriteDoFill,
    /// Fill and mark the silhouette in the stencil buffer.
    DoStencilWriteDoFill,
    /// Mark the silhouette without writing color.
    DoStencilWriteNoFill,
    /// Draw the outline color where the silhouette is not marked.
    DoStencilTestNoFill,
}

impl StencilPass {
    /// Every pass, in render order.
    pub const ALL: [StencilPass; 4] = [
        StencilPass::NoStencilWriteDoFill,
        StencilPass::DoStencilWriteDoFill,
        StencilPass::DoStencilWriteNoFill,
        StencilPass::DoStencilTestNoFill,
    ];

    /// Passes that render the fill color.
    pub const FILL: [StencilPass; 2] = [
        StencilPass::NoStencilWriteDoFill,
        StencilPass::DoStencilWriteDoFill,
    ];

    /// Passes that build and render outlines.
    pub const OUTLINE: [StencilPass; 2] = [
        StencilPass::DoStencilWriteNoFill,
        StencilPass::DoStencilTestNoFill,
    ];

    /// Position of the pass in [`StencilPass::ALL`].
    pub fn index(self) -> usize {
        match self {
            StencilPass::NoStencilWriteDoFill => 0,
            StencilPass::DoStencilWriteDoFill => 1,
            StencilPass::DoStencilWriteNoFill => 2,
            StencilPass::DoStencilTestNoFill => 3,
        }
    }

    /// Whether instances of this pass carry the fill color.
    pub fn is_fill(self) -> bool {
        matches!(
            self,
            StencilPass::NoStencilWriteDoFill | StencilPass::DoStencilWriteDoFill
        )
    }

    /// Whether the pass writes the stencil buffer.
    pub fn writes_stencil(self) -> bool {
        matches!(
            self,
            StencilPass::DoStencilWriteDoFill | StencilPass::DoStencilWriteNoFill
        )
    }

    /// Whether 3D instances of this pass go through the lit fragment stage.
    pub fn is_lit(self) -> bool {
        self.is_fill()
    }

    /// Short name used in labels.
    pub fn label(self) -> &'static str {
        match self {
            StencilPass::NoStencilWriteDoFill => "fill",
            StencilPass::DoStencilWriteDoFill => "stencil_write_fill",
            StencilPass::DoStencilWriteNoFill => "stencil_write",
            StencilPass::DoStencilTestNoFill => "stencil_test",
        }
    }

    /// The explicit draw flag selecting this pass.
    pub fn flag(self) -> DrawFlags {
        match self {
            StencilPass::NoStencilWriteDoFill => DrawFlags::NO_STENCIL_WRITE_DO_FILL,
            StencilPass::DoStencilWriteDoFill => DrawFlags::DO_STENCIL_WRITE_DO_FILL,
            StencilPass::DoStencilWriteNoFill => DrawFlags::DO_STENCIL_WRITE_NO_FILL,
            StencilPass::DoStencilTestNoFill => DrawFlags::DO_STENCIL_TEST_NO_FILL,
        }
    }

    /// Color channels written by the pass.
    pub fn color_writes(self) -> wgpu::ColorWrites {
        match self {
            StencilPass::DoStencilWriteNoFill => wgpu::ColorWrites::empty(),
            _ => wgpu::ColorWrites::ALL,
        }
    }

    /// Stencil face state of the pass.
    pub fn stencil_face(self) -> wgpu::StencilFaceState {
        match self {
            StencilPass::NoStencilWriteDoFill => wgpu::StencilFaceState::IGNORE,
            StencilPass::DoStencilWriteDoFill | StencilPass::DoStencilWriteNoFill => {
                wgpu::StencilFaceState {
                    compare: wgpu::CompareFunction::Always,
                    fail_op: wgpu::StencilOperation::Keep,
                    depth_fail_op: wgpu::StencilOperation::Keep,
                    pass_op: wgpu::StencilOperation::Replace,
                }
            }
            StencilPass::DoStencilTestNoFill => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::NotEqual,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            },
        }
    }

    /// Full depth-stencil state of the pass.
    ///
    /// `depth_test` is false for 2D pipelines, which only use the stencil aspect.
    pub fn depth_stencil_state(
        self,
        format: wgpu::TextureFormat,
        depth_test: bool,
    ) -> wgpu::DepthStencilState {
        let face = self.stencil_face();
        let write_mask = if self.writes_stencil() { 0xFF } else { 0x00 };
        let read_mask = if self == StencilPass::DoStencilTestNoFill {
            0xFF
        } else {
            0x00
        };

        let (depth_write_enabled, depth_compare) = match (depth_test, self) {
            (false, _) => (false, wgpu::CompareFunction::Always),
            (true, StencilPass::NoStencilWriteDoFill | StencilPass::DoStencilWriteDoFill) => {
                (true, wgpu::CompareFunction::Less)
            }
            (true, StencilPass::DoStencilWriteNoFill) => (false, wgpu::CompareFunction::Less),
            (true, StencilPass::DoStencilTestNoFill) => (false, wgpu::CompareFunction::LessEqual),
        };

        wgpu::DepthStencilState {
            format,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState {
                front: face,
                back: face,
                read_mask,
                write_mask,
            },
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Builds one value per pass, in [`StencilPass::ALL`] order.
pub fn per_pass<T>(mut f: impl FnMut(StencilPass) -> Result<T>) -> Result<[T; 4]> {
    Ok([
        f(StencilPass::ALL[0])?,
        f(StencilPass::ALL[1])?,
        f(StencilPass::ALL[2])?,
        f(StencilPass::ALL[3])?,
    ])
}

bitflags! {
    /// Routing of a single draw request.
    ///
    /// With [`DrawFlags::AUTO`] the pass selection follows the fill and outline switches of
    /// the [`RenderState`]. Explicit pass bits bypass that logic; compound shapes use them to
    /// submit outline geometry they computed themselves.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DrawFlags: u8 {
        /// Resolve the passes from the render state.
        const AUTO = 0;
        const NO_STENCIL_WRITE_DO_FILL = 1 << 0;
        const DO_STENCIL_WRITE_DO_FILL = 1 << 1;
        const DO_STENCIL_WRITE_NO_FILL = 1 << 2;
        const DO_STENCIL_TEST_NO_FILL = 1 << 3;
        /// Scale the outline-test copy by `1 + outline_width` even with explicit pass bits.
        const DO_STENCIL_SCALE = 1 << 4;
    }
}

impl DrawFlags {
    /// Bits selecting explicit passes.
    pub const PASSES: DrawFlags = DrawFlags::NO_STENCIL_WRITE_DO_FILL
        .union(DrawFlags::DO_STENCIL_WRITE_DO_FILL)
        .union(DrawFlags::DO_STENCIL_WRITE_NO_FILL)
        .union(DrawFlags::DO_STENCIL_TEST_NO_FILL);

    /// Whether the pass selection must be derived from the render state.
    pub fn is_auto(self) -> bool {
        !self.intersects(DrawFlags::PASSES)
    }
}

/// One submission produced by a draw request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PassSubmission {
    /// Target pipeline variant.
    pub pass: StencilPass,
    /// Whether the transform is scaled by `1 + outline_width`.
    pub scaled: bool,
}

/// The submissions of one draw request, in render order. Holds at most four entries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PassPlan {
    entries: [Option<PassSubmission>; 4],
    len: usize,
}

impl PassPlan {
    fn push(&mut self, pass: StencilPass, scaled: bool) {
        self.entries[self.len] = Some(PassSubmission { pass, scaled });
        self.len += 1;
    }

    /// Number of submissions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the request draws nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The submissions.
    pub fn iter(&self) -> impl Iterator<Item = PassSubmission> + '_ {
        self.entries[..self.len].iter().flatten().copied()
    }
}

/// Selects the passes a draw request is submitted to.
///
/// | fill | outline | submissions                                        |
/// |------|---------|----------------------------------------------------|
/// | yes  | no      | `NoStencilWriteDoFill`                             |
/// | yes  | yes     | `DoStencilWriteDoFill`, scaled `DoStencilTestNoFill` |
/// | no   | yes     | `DoStencilWriteNoFill`, scaled `DoStencilTestNoFill` |
/// | no   | no      | nothing                                            |
pub fn resolve_passes(flags: DrawFlags, fill: bool, outline: bool) -> PassPlan {
    let mut plan = PassPlan::default();

    if flags.is_auto() {
        match (fill, outline) {
            (true, false) => plan.push(StencilPass::NoStencilWriteDoFill, false),
            (true, true) => {
                plan.push(StencilPass::DoStencilWriteDoFill, false);
                plan.push(StencilPass::DoStencilTestNoFill, true);
            }
            (false, true) => {
                plan.push(StencilPass::DoStencilWriteNoFill, false);
                plan.push(StencilPass::DoStencilTestNoFill, true);
            }
            (false, false) => {}
        }
        return plan;
    }

    let scale = flags.contains(DrawFlags::DO_STENCIL_SCALE);
    for pass in StencilPass::ALL {
        if flags.contains(pass.flag()) {
            plan.push(pass, scale && pass == StencilPass::DoStencilTestNoFill);
        }
    }
    plan
}

/// Drawing state applied to every shape: transform, colors and fill/outline switches.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderState<D: Dimension> {
    /// Transform applied to every shape, inside the axes.
    pub transform: D::Transform,
    /// Coordinate system the transform is expressed in.
    pub axes: D::Transform,
    pub fill_color: Color,
    pub outline_color: Color,
    /// Outline thickness, relative to the shape size.
    pub outline_width: f32,
    pub fill: bool,
    pub outline: bool,
    /// Lit-path material (ignored in 2D).
    pub material: Material,
    /// Color given to the lights added with this state (3D only).
    pub light_color: Color,
}

impl<D: Dimension> Default for RenderState<D> {
    fn default() -> Self {
        Self {
            transform: D::identity(),
            axes: D::identity(),
            fill_color: color::WHITE,
            outline_color: color::ORANGE,
            outline_width: 0.1,
            fill: true,
            outline: false,
            material: Material::default(),
            light_color: color::WHITE,
        }
    }
}

impl<D: Dimension> RenderState<D> {
    /// Fails when the outline width is negative.
    pub fn validate(&self) -> Result<()> {
        if self.outline_width < 0.0 {
            return Err(OnyxError::NegativeOutlineWidth(self.outline_width));
        }
        Ok(())
    }

    /// Maps a shape's own frame to world space: axes, then transform, then `local`.
    pub fn world(&self, local: &D::Transform) -> D::Transform {
        self.axes * self.transform * *local
    }

    /// Builds the instance record of `transform` for the given submission.
    ///
    /// Fill passes carry the fill color and no texture; outline passes carry the outline color
    /// and the outline width.
    pub fn stamp(&self, transform: &D::Transform, submission: PassSubmission) -> D::Instance {
        let transform = if submission.scaled {
            D::scale_outline(transform, 1.0 + self.outline_width)
        } else {
            *transform
        };

        let (color, extra) = if submission.pass.is_fill() {
            (self.fill_color, InstanceExtra::TextureIndex(NO_TEXTURE))
        } else {
            (self.outline_color, InstanceExtra::OutlineWidth(self.outline_width))
        };

        D::instance(
            D::encode_basis(&transform),
            pack_color(color),
            extra.to_bits(),
            self.material,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{D2, D3};
    use glamx::{Mat3, Vec2};

    fn passes(plan: &PassPlan) -> Vec<StencilPass> {
        plan.iter().map(|s| s.pass).collect()
    }

    #[test]
    fn test_auto_fill_only_uses_plain_fill() {
        let plan = resolve_passes(DrawFlags::AUTO, true, false);
        assert_eq!(passes(&plan), vec![StencilPass::NoStencilWriteDoFill]);
    }

    #[test]
    fn test_auto_fill_and_outline_doubles() {
        let plan = resolve_passes(DrawFlags::AUTO, true, true);
        assert_eq!(plan.len(), 2);
        assert_eq!(
            passes(&plan),
            vec![
                StencilPass::DoStencilWriteDoFill,
                StencilPass::DoStencilTestNoFill
            ]
        );
        let scaled: Vec<bool> = plan.iter().map(|s| s.scaled).collect();
        assert_eq!(scaled, vec![false, true]);
    }

    #[test]
    fn test_auto_outline_only_masks_without_color() {
        let plan = resolve_passes(DrawFlags::AUTO, false, true);
        assert_eq!(
            passes(&plan),
            vec![
                StencilPass::DoStencilWriteNoFill,
                StencilPass::DoStencilTestNoFill
            ]
        );
    }

    #[test]
    fn test_auto_nothing_to_draw() {
        assert!(resolve_passes(DrawFlags::AUTO, false, false).is_empty());
    }

    #[test]
    fn test_explicit_flags_ignore_state() {
        let plan = resolve_passes(DrawFlags::DO_STENCIL_TEST_NO_FILL, true, false);
        assert_eq!(passes(&plan), vec![StencilPass::DoStencilTestNoFill]);
        assert!(!plan.iter().next().map(|s| s.scaled).unwrap_or(true));

        let plan = resolve_passes(
            DrawFlags::DO_STENCIL_TEST_NO_FILL | DrawFlags::DO_STENCIL_SCALE,
            true,
            false,
        );
        assert!(plan.iter().all(|s| s.scaled));
    }

    #[test]
    fn test_explicit_flags_follow_render_order() {
        let plan = resolve_passes(
            DrawFlags::DO_STENCIL_TEST_NO_FILL | DrawFlags::NO_STENCIL_WRITE_DO_FILL,
            false,
            false,
        );
        assert_eq!(
            passes(&plan),
            vec![
                StencilPass::NoStencilWriteDoFill,
                StencilPass::DoStencilTestNoFill
            ]
        );
    }

    #[test]
    fn test_stencil_write_state() {
        let state = StencilPass::DoStencilWriteDoFill
            .depth_stencil_state(wgpu::TextureFormat::Depth24PlusStencil8, true);
        assert_eq!(state.stencil.write_mask, 0xFF);
        assert_eq!(state.stencil.front.compare, wgpu::CompareFunction::Always);
        assert_eq!(state.stencil.front.pass_op, wgpu::StencilOperation::Replace);
        assert!(state.depth_write_enabled);
    }

    #[test]
    fn test_stencil_test_state() {
        let state = StencilPass::DoStencilTestNoFill
            .depth_stencil_state(wgpu::TextureFormat::Depth24PlusStencil8, true);
        assert_eq!(state.stencil.write_mask, 0);
        assert_eq!(state.stencil.front.compare, wgpu::CompareFunction::NotEqual);
        assert!(!state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::LessEqual);
    }

    #[test]
    fn test_plain_fill_does_not_touch_stencil() {
        let state = StencilPass::NoStencilWriteDoFill
            .depth_stencil_state(wgpu::TextureFormat::Depth24PlusStencil8, false);
        assert_eq!(state.stencil.write_mask, 0);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Always);
        assert!(!state.depth_write_enabled);
    }

    #[test]
    fn test_mask_pass_writes_no_color() {
        assert!(StencilPass::DoStencilWriteNoFill.color_writes().is_empty());
        assert_eq!(
            StencilPass::DoStencilTestNoFill.color_writes(),
            wgpu::ColorWrites::ALL
        );
    }

    #[test]
    fn test_stamp_outline_scales_and_switches_color() {
        let state = RenderState::<D2> {
            outline_width: 0.5,
            fill_color: color::BLUE,
            outline_color: color::RED,
            ..Default::default()
        };
        let transform = Mat3::from_translation(Vec2::new(3.0, 0.0));

        let fill = state.stamp(
            &transform,
            PassSubmission {
                pass: StencilPass::DoStencilWriteDoFill,
                scaled: false,
            },
        );
        assert_eq!(fill.color, pack_color(color::BLUE));
        assert_eq!(fill.extra, NO_TEXTURE);
        assert_eq!(fill.basis[0], [1.0, 0.0]);

        let outline = state.stamp(
            &transform,
            PassSubmission {
                pass: StencilPass::DoStencilTestNoFill,
                scaled: true,
            },
        );
        assert_eq!(outline.color, pack_color(color::RED));
        assert_eq!(f32::from_bits(outline.extra), 0.5);
        assert_eq!(outline.basis[0], [1.5, 0.0]);
        assert_eq!(outline.basis[2], [3.0, 0.0]);
    }

    #[test]
    fn test_world_applies_axes_outside_transform() {
        let state = RenderState::<D2> {
            axes: Mat3::from_scale(Vec2::splat(2.0)),
            transform: Mat3::from_translation(Vec2::new(1.0, 0.0)),
            ..Default::default()
        };
        let local = Mat3::from_translation(Vec2::new(0.0, 1.0));
        let origin = state.world(&local).transform_point2(Vec2::ZERO);
        assert!(origin.abs_diff_eq(Vec2::new(2.0, 2.0), 1.0e-6));
    }

    #[test]
    fn test_negative_outline_width_is_rejected() {
        let state = RenderState::<D3> {
            outline_width: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            state.validate(),
            Err(OnyxError::NegativeOutlineWidth(_))
        ));
    }
}
