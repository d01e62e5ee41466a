//! # Deferred Rendering Commands
//!
//! A [`Command`] is one unit of GPU work or state change, captured at enqueue
//! time and replayed later by a command list. Kinds form a closed set, so the
//! representation is a tagged union dispatched with a single match rather
//! than a trait object per command.
//!
//! Draw commands compute their [`SortKey`] once, at construction, from their
//! own material/mesh/depth inputs. The key never changes after enqueue, which
//! is what makes the stable radix sort meaningful.

use nalgebra::Matrix4;

use super::device::{
    BlendState, ClearFlags, DepthState, DeviceError, MaterialId, MeshId, RenderDevice,
    RenderTargetId,
};
use super::sort_key::{SortKey, PRIORITY_OVERLAY};

/// Kind-specific payload of a deferred command
#[derive(Debug, Clone)]
pub enum CommandKind {
    /// Draw indexed geometry
    DrawIndexed {
        /// Geometry to draw
        mesh: MeshId,
        /// Material to draw it with
        material: MaterialId,
        /// World transform captured at enqueue time
        transform: Matrix4<f32>,
    },
    /// Bind a blend state
    SetBlendState(BlendState),
    /// Bind a depth state
    SetDepthState(DepthState),
    /// Upload per-frame constant data
    UpdateConstants {
        /// View/projection transform captured at enqueue time
        transform: Matrix4<f32>,
    },
    /// Bind a render target
    SetRenderTarget(RenderTargetId),
    /// Clear the bound target's attachments
    ClearTarget {
        /// Attachments to clear
        flags: ClearFlags,
        /// Clear color for the color attachment
        color: [f32; 4],
    },
    /// Present the back buffer
    Present,
    /// Re-acquire the back-buffer view
    GetBackBufferView,
}

/// One deferred unit of GPU work or state change, carrying its sort key
#[derive(Debug, Clone)]
pub struct Command {
    key: SortKey,
    kind: CommandKind,
}

impl Command {
    /// Create a draw command, computing its sort key from the batching inputs
    ///
    /// A `priority` of [`PRIORITY_OVERLAY`] marks an always-on-top primitive:
    /// its key ignores `depth` and sorts after all depth-ordered geometry.
    #[must_use]
    pub fn draw_indexed(
        mesh: MeshId,
        material: MaterialId,
        transform: Matrix4<f32>,
        depth: f32,
        priority: u8,
    ) -> Self {
        let key = if priority == PRIORITY_OVERLAY {
            SortKey::overlay(material, mesh)
        } else {
            SortKey::for_draw(depth, material, mesh, priority)
        };
        Self {
            key,
            kind: CommandKind::DrawIndexed {
                mesh,
                material,
                transform,
            },
        }
    }

    /// Create a blend-state change command
    #[must_use]
    pub const fn set_blend_state(state: BlendState) -> Self {
        Self {
            key: SortKey::ZERO,
            kind: CommandKind::SetBlendState(state),
        }
    }

    /// Create a depth-state change command
    #[must_use]
    pub const fn set_depth_state(state: DepthState) -> Self {
        Self {
            key: SortKey::ZERO,
            kind: CommandKind::SetDepthState(state),
        }
    }

    /// Create a constant-upload command
    #[must_use]
    pub const fn update_constants(transform: Matrix4<f32>) -> Self {
        Self {
            key: SortKey::ZERO,
            kind: CommandKind::UpdateConstants { transform },
        }
    }

    /// Create a render-target bind command
    #[must_use]
    pub const fn set_render_target(target: RenderTargetId) -> Self {
        Self {
            key: SortKey::ZERO,
            kind: CommandKind::SetRenderTarget(target),
        }
    }

    /// Create a clear command
    #[must_use]
    pub const fn clear_target(flags: ClearFlags, color: [f32; 4]) -> Self {
        Self {
            key: SortKey::ZERO,
            kind: CommandKind::ClearTarget { flags, color },
        }
    }

    /// Create a present command
    #[must_use]
    pub const fn present() -> Self {
        Self {
            key: SortKey::ZERO,
            kind: CommandKind::Present,
        }
    }

    /// Create a back-buffer-view acquisition command
    #[must_use]
    pub const fn get_back_buffer_view() -> Self {
        Self {
            key: SortKey::ZERO,
            kind: CommandKind::GetBackBufferView,
        }
    }

    /// The batching key computed at construction
    #[must_use]
    pub const fn key(&self) -> SortKey {
        self.key
    }

    /// The kind-specific payload
    #[must_use]
    pub const fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Whether this command participates in draw sorting
    #[must_use]
    pub const fn is_draw(&self) -> bool {
        matches!(self.kind, CommandKind::DrawIndexed { .. })
    }

    /// Execute the command against a device, consuming it
    ///
    /// Device failures are absorbed here: the error is logged and the command
    /// is skipped, so one missing resource never aborts the rest of the list.
    pub fn execute(self, device: &mut dyn RenderDevice) {
        let result = match &self.kind {
            CommandKind::DrawIndexed {
                mesh,
                material,
                transform,
            } => device.draw_indexed(*mesh, *material, transform),
            CommandKind::SetBlendState(state) => device.set_blend_state(*state),
            CommandKind::SetDepthState(state) => device.set_depth_state(*state),
            CommandKind::UpdateConstants { transform } => device.update_constants(transform),
            CommandKind::SetRenderTarget(target) => device.set_render_target(*target),
            CommandKind::ClearTarget { flags, color } => device.clear_target(*flags, *color),
            CommandKind::Present => device.present(),
            CommandKind::GetBackBufferView => device.acquire_back_buffer_view(),
        };

        if let Err(err) = result {
            log_skip(&self.kind, &err);
        }
    }
}

/// Split a batch into (draws, others), preserving enqueue order within each
#[must_use]
pub fn split_draws(commands: Vec<Command>) -> (Vec<Command>, Vec<Command>) {
    let mut draws = Vec::with_capacity(commands.len());
    let mut others = Vec::new();
    for command in commands {
        if command.is_draw() {
            draws.push(command);
        } else {
            others.push(command);
        }
    }
    (draws, others)
}

fn log_skip(kind: &CommandKind, err: &DeviceError) {
    match kind {
        CommandKind::DrawIndexed { mesh, material, .. } => {
            log::warn!("skipping draw (mesh {mesh:?}, material {material:?}): {err}");
        }
        other => {
            log::warn!("command failed and was skipped ({other:?}): {err}");
        }
    }
}
