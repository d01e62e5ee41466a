//! # Render Device Abstraction
//!
//! The command engine treats "execute a command" as an opaque capability
//! supplied by collaborators. [`RenderDevice`] is that capability: one method
//! per command kind, each operating only on data captured at enqueue time.
//!
//! Device methods report failures through [`DeviceError`], but a failing
//! method never aborts a command-list run; the executor logs the error and
//! skips the offending command.

use nalgebra::Matrix4;

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors a device implementation may report while executing a command
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// A referenced resource (material, mesh, target) is not resident
    #[error("render resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// A transient GPU allocation (constant buffer, staging memory) failed
    #[error("transient GPU allocation failed: {0}")]
    AllocationFailed(String),

    /// The underlying device/context has been lost
    #[error("render device lost")]
    DeviceLost,
}

/// Opaque material identifier used for sort-key material bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MaterialId(pub u16);

/// Opaque mesh/geometry identifier used for sort-key mesh bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MeshId(pub u8);

/// Opaque render-target identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderTargetId(pub u32);

/// Fixed-function blend configuration selected by a state-change command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendState {
    /// No blending, source overwrites destination
    Opaque,
    /// Standard source-alpha blending
    AlphaBlend,
    /// Additive blending for emissive/particle passes
    Additive,
}

/// Depth test/write configuration selected by a state-change command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthState {
    /// Depth test and writes disabled
    Disabled,
    /// Depth test enabled, writes disabled (transparent geometry)
    ReadOnly,
    /// Depth test and writes enabled
    ReadWrite,
}

bitflags::bitflags! {
    /// Which attachments a clear command touches
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u8 {
        /// Clear the color attachment
        const COLOR = 0b001;
        /// Clear the depth attachment
        const DEPTH = 0b010;
        /// Clear the stencil attachment
        const STENCIL = 0b100;
    }
}

/// The GPU-facing capability every command executes against
///
/// Implementations capture whatever backend handle they need (a Vulkan
/// context, a software rasterizer, a recording mock in tests). All calls for
/// one command list happen on the submission thread, so implementations need
/// no internal locking.
pub trait RenderDevice {
    /// Draw indexed geometry with the given material and world transform
    fn draw_indexed(
        &mut self,
        mesh: MeshId,
        material: MaterialId,
        transform: &Matrix4<f32>,
    ) -> DeviceResult<()>;

    /// Bind a blend state
    fn set_blend_state(&mut self, state: BlendState) -> DeviceResult<()>;

    /// Bind a depth state
    fn set_depth_state(&mut self, state: DepthState) -> DeviceResult<()>;

    /// Upload per-frame constant data (view/projection transform)
    fn update_constants(&mut self, transform: &Matrix4<f32>) -> DeviceResult<()>;

    /// Bind a render target for subsequent draws
    fn set_render_target(&mut self, target: RenderTargetId) -> DeviceResult<()>;

    /// Clear the bound target's attachments
    fn clear_target(&mut self, flags: ClearFlags, color: [f32; 4]) -> DeviceResult<()>;

    /// Present the back buffer
    fn present(&mut self) -> DeviceResult<()>;

    /// Re-acquire the back-buffer view (after resize/target changes)
    fn acquire_back_buffer_view(&mut self) -> DeviceResult<()>;
}

/// A device that accepts every command and does nothing
///
/// Useful for headless runs, profiling the submission path in isolation, and
/// as a placeholder while a real backend is being brought up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDevice;

impl RenderDevice for NullDevice {
    fn draw_indexed(
        &mut self,
        _mesh: MeshId,
        _material: MaterialId,
        _transform: &Matrix4<f32>,
    ) -> DeviceResult<()> {
        Ok(())
    }

    fn set_blend_state(&mut self, _state: BlendState) -> DeviceResult<()> {
        Ok(())
    }

    fn set_depth_state(&mut self, _state: DepthState) -> DeviceResult<()> {
        Ok(())
    }

    fn update_constants(&mut self, _transform: &Matrix4<f32>) -> DeviceResult<()> {
        Ok(())
    }

    fn set_render_target(&mut self, _target: RenderTargetId) -> DeviceResult<()> {
        Ok(())
    }

    fn clear_target(&mut self, _flags: ClearFlags, _color: [f32; 4]) -> DeviceResult<()> {
        Ok(())
    }

    fn present(&mut self) -> DeviceResult<()> {
        Ok(())
    }

    fn acquire_back_buffer_view(&mut self) -> DeviceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_device_accepts_everything() {
        let mut device = NullDevice;
        assert!(device
            .draw_indexed(MeshId(1), MaterialId(2), &Matrix4::identity())
            .is_ok());
        assert!(device.set_blend_state(BlendState::Additive).is_ok());
        assert!(device
            .clear_target(ClearFlags::COLOR | ClearFlags::DEPTH, [0.0; 4])
            .is_ok());
        assert!(device.present().is_ok());
    }

    #[test]
    fn test_clear_flags_combine() {
        let flags = ClearFlags::COLOR | ClearFlags::STENCIL;
        assert!(flags.contains(ClearFlags::COLOR));
        assert!(!flags.contains(ClearFlags::DEPTH));
    }
}
