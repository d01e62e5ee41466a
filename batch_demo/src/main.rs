//! Synthetic frame benchmark for the command engine
//!
//! Fills a command list with a realistic frame shape (target setup, clears,
//! a few thousand randomly keyed draws, overlay primitives, present) and
//! commits it with each of the three strategies, logging the stats so the
//! strategies can be compared side by side.

use command_engine::prelude::*;
use command_engine::render::PRIORITY_OVERLAY;
use nalgebra::Matrix4;
use rand::{rngs::StdRng, Rng, SeedableRng};

const DRAWS_PER_FRAME: usize = 20_000;
const OVERLAY_DRAWS: usize = 32;
const MATERIAL_COUNT: u16 = 64;
const MESH_COUNT: u8 = 16;

fn fill_frame(list: &CommandList<NullDevice>, rng: &mut StdRng) {
    list.set_render_target(RenderTargetId(0));
    list.clear_target(ClearFlags::COLOR | ClearFlags::DEPTH, [0.05, 0.05, 0.1, 1.0]);
    list.update_constants(Matrix4::identity());
    list.set_depth_state(DepthState::ReadWrite);
    list.set_blend_state(BlendState::Opaque);

    for _ in 0..DRAWS_PER_FRAME {
        let material = MaterialId(rng.gen_range(0..MATERIAL_COUNT));
        let mesh = MeshId(rng.gen_range(0..MESH_COUNT));
        let depth = rng.gen_range(0.1f32..500.0);
        list.draw_indexed(mesh, material, Matrix4::identity(), depth, 0);
    }

    // Gizmo-style primitives that must render last, independent of depth.
    for i in 0..OVERLAY_DRAWS {
        list.draw_indexed(
            MeshId((i % usize::from(MESH_COUNT)) as u8),
            MaterialId(MATERIAL_COUNT),
            Matrix4::identity(),
            0.0,
            PRIORITY_OVERLAY,
        );
    }

    list.present();
}

fn run_strategy(strategy: ExecutionStrategy, config: &CommandListConfig, rng: &mut StdRng) {
    let list = CommandList::with_config(NullDevice, config);
    fill_frame(&list, rng);
    let queued = list.command_count();

    list.execute_with_strategy(strategy);

    let stats = list.stats();
    log::info!(
        "{strategy:?}: {queued} queued, {} executed, {} draws, {} material changes, sort {}us, execute {}us",
        stats.executed_commands,
        stats.draw_calls,
        stats.material_changes,
        stats.sort_time_us,
        stats.execute_time_us,
    );
}

fn main() {
    command_engine::foundation::logging::init_with_default("info");

    let config = CommandListConfig {
        sort_scratch_capacity: DRAWS_PER_FRAME + OVERLAY_DRAWS,
        ..CommandListConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(42);

    log::info!(
        "committing {} draws + {} overlays per frame",
        DRAWS_PER_FRAME,
        OVERLAY_DRAWS
    );

    for strategy in [
        ExecutionStrategy::Sequential,
        ExecutionStrategy::MaterialSorted,
        ExecutionStrategy::MultithreadedSorted,
    ] {
        run_strategy(strategy, &config, &mut rng);
    }
}
