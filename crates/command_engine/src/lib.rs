//! # Command Engine
//!
//! A deferred render-command submission and sort-key batching engine.
//!
//! Scene renderers, debug overlays, and UI code all produce heterogeneous
//! drawing and state-change requests every frame. This crate collects those
//! requests into a [`render::CommandList`], optionally reorders the draw
//! subset to minimize expensive GPU state transitions, and replays everything
//! against an opaque [`render::RenderDevice`] under statistics tracking.
//!
//! ## Features
//!
//! - **Deferred submission**: commands are captured at enqueue time and
//!   replayed later at a single commit point
//! - **Sort-key batching**: 64-bit packed keys (depth, material, mesh,
//!   priority) sorted by a stable 8-pass radix sort
//! - **Three commit strategies**: sequential FIFO, material-sorted, and
//!   multithreaded-sorted (classification and sorting on a worker thread)
//! - **Instrumentation**: executed-command, draw-call, and material-change
//!   counters plus sort/execute timings for profiling overlays
//!
//! ## Quick Start
//!
//! ```rust
//! use command_engine::prelude::*;
//! use nalgebra::Matrix4;
//!
//! let list = CommandList::new(NullDevice);
//! list.set_blend_state(BlendState::Opaque);
//! list.draw_indexed(MeshId(3), MaterialId(7), Matrix4::identity(), 12.5, 0);
//! list.present();
//! list.execute_with_material_sorting();
//! assert_eq!(list.total_draw_calls(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{CommandListConfig, Config, ConfigError, ExecutionStrategy},
        render::{
            BlendState, ClearFlags, Command, CommandKind, CommandList, DepthState, DeviceError,
            ExecutionStats, MaterialId, MeshId, NullDevice, RenderDevice, RenderTargetId, SortKey,
        },
    };
}
