//! # Radix Sort for Draw Commands
//!
//! Stable least-significant-digit radix sort specialized for ordering large
//! draw batches by their 64-bit sort key: 8-bit digits, therefore exactly 8
//! passes to cover the key. Runtime is linear in the batch size regardless of
//! key distribution.
//!
//! The sorter keeps its scratch buffers between calls (reset, not freed), so
//! a command list sorting tens of thousands of draws per frame allocates only
//! on the first frame or when the batch grows.

use super::command::Command;

const DIGIT_BITS: u32 = 8;
const BUCKETS: usize = 1 << DIGIT_BITS;
const PASSES: u32 = 64 / DIGIT_BITS;

/// Key/index pair moved through the ping-pong buffers
///
/// Sorting indices instead of whole commands keeps each pass a tight copy
/// loop; the commands themselves are permuted once at the end.
type KeyedIndex = (u64, u32);

/// Reusable stable radix sorter for draw-command batches
#[derive(Debug, Default)]
pub struct RadixSorter {
    keys: Vec<KeyedIndex>,
    scratch: Vec<KeyedIndex>,
}

impl RadixSorter {
    /// Create a sorter with empty scratch buffers
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keys: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Create a sorter with scratch pre-sized for `capacity` commands
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            scratch: Vec::with_capacity(capacity),
        }
    }

    /// Sort `commands` in place by ascending sort key
    ///
    /// Stable: two commands with identical keys keep their original relative
    /// order. The sorted sequence always ends up back in `commands`,
    /// independent of pass parity. Batches of length <= 1 return immediately.
    pub fn sort(&mut self, commands: &mut Vec<Command>) {
        let len = commands.len();
        if len <= 1 {
            return;
        }
        debug_assert!(u32::try_from(len).is_ok(), "batch exceeds u32 index range");

        self.keys.clear();
        self.keys.extend(
            commands
                .iter()
                .enumerate()
                .map(|(index, command)| (command.key().raw(), index as u32)),
        );
        self.scratch.clear();
        self.scratch.resize(len, (0, 0));

        for pass in 0..PASSES {
            let shift = pass * DIGIT_BITS;

            // (a) histogram over the current digit
            let mut histogram = [0usize; BUCKETS];
            for &(key, _) in &self.keys {
                histogram[((key >> shift) & 0xFF) as usize] += 1;
            }

            // (b) exclusive prefix sum gives each bucket its start offset
            let mut offsets = [0usize; BUCKETS];
            let mut total = 0usize;
            for (bucket, count) in histogram.iter().enumerate() {
                offsets[bucket] = total;
                total += count;
            }

            // (c) scatter in source order, which preserves stability
            for &entry in &self.keys {
                let bucket = ((entry.0 >> shift) & 0xFF) as usize;
                self.scratch[offsets[bucket]] = entry;
                offsets[bucket] += 1;
            }

            // (d) swap source and destination for the next pass
            std::mem::swap(&mut self.keys, &mut self.scratch);
        }

        // PASSES is even, so the final order lives in `keys` again. Apply the
        // permutation to the caller's vector with a single take pass.
        let mut slots: Vec<Option<Command>> = commands.drain(..).map(Some).collect();
        commands.extend(
            self.keys
                .iter()
                .filter_map(|&(_, index)| slots[index as usize].take()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{MaterialId, MeshId};
    use nalgebra::Matrix4;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn draw(material: u16, mesh: u8, depth: f32) -> Command {
        Command::draw_indexed(MeshId(mesh), MaterialId(material), Matrix4::identity(), depth, 0)
    }

    #[test]
    fn test_empty_and_single_are_noops() {
        let mut sorter = RadixSorter::new();

        let mut empty: Vec<Command> = Vec::new();
        sorter.sort(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![draw(5, 1, 10.0)];
        sorter.sort(&mut single);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].key().material_id(), MaterialId(5));
    }

    #[test]
    fn test_sorts_by_ascending_key() {
        let mut sorter = RadixSorter::new();
        let mut commands = vec![
            draw(3, 0, 50.0),
            draw(1, 0, 10.0),
            draw(2, 0, 30.0),
            draw(0, 0, 5.0),
        ];

        sorter.sort(&mut commands);

        let keys: Vec<u64> = commands.iter().map(|c| c.key().raw()).collect();
        let mut expected = keys.clone();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(commands[0].key().material_id(), MaterialId(0));
        assert_eq!(commands[3].key().material_id(), MaterialId(3));
    }

    #[test]
    fn test_stability_for_identical_keys() {
        // Same key fields, distinguished only by their captured transform.
        let mut commands: Vec<Command> = (0..16)
            .map(|i| {
                Command::draw_indexed(
                    MeshId(7),
                    MaterialId(42),
                    Matrix4::new_scaling(i as f32 + 1.0),
                    2.0,
                    0,
                )
            })
            .collect();

        let mut sorter = RadixSorter::new();
        sorter.sort(&mut commands);

        for (i, command) in commands.iter().enumerate() {
            match command.kind() {
                crate::render::CommandKind::DrawIndexed { transform, .. } => {
                    assert!(
                        (transform[(0, 0)] - (i as f32 + 1.0)).abs() < f32::EPSILON,
                        "equal-key commands were reordered"
                    );
                }
                other => panic!("unexpected kind: {other:?}"),
            }
        }
    }

    #[test]
    fn test_matches_comparison_sort_at_scale() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let mut commands: Vec<Command> = (0..100_000)
            .map(|_| {
                draw(
                    rng.gen::<u16>(),
                    rng.gen::<u8>(),
                    rng.gen_range(0.0f32..10_000.0),
                )
            })
            .collect();

        let mut expected: Vec<u64> = commands.iter().map(|c| c.key().raw()).collect();
        expected.sort_unstable();

        let mut sorter = RadixSorter::with_capacity(commands.len());
        sorter.sort(&mut commands);

        let sorted: Vec<u64> = commands.iter().map(|c| c.key().raw()).collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_scratch_reuse_across_calls() {
        let mut sorter = RadixSorter::with_capacity(8);

        let mut first = vec![draw(2, 0, 20.0), draw(1, 0, 10.0)];
        sorter.sort(&mut first);
        assert_eq!(first[0].key().material_id(), MaterialId(1));

        let mut second = vec![draw(9, 0, 90.0), draw(4, 0, 40.0), draw(6, 0, 60.0)];
        sorter.sort(&mut second);
        let materials: Vec<MaterialId> =
            second.iter().map(|c| c.key().material_id()).collect();
        assert_eq!(materials, vec![MaterialId(4), MaterialId(6), MaterialId(9)]);
    }
}
