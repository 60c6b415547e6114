#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tunedeck::model::PlayMode;
use tunedeck::policy::{Direction, RandomHistory, target_index};

fuzz_target!(|data: &[u8]| {
    let Some((&first, ops)) = data.split_first() else {
        return;
    };
    let mut size = usize::from(first % 32);
    let mut mode = PlayMode::Sequence;
    let mut current: Option<usize> = None;
    let mut history = RandomHistory::new();
    let mut rng = SmallRng::seed_from_u64(u64::from(first));

    for byte in ops {
        match byte % 5 {
            0 => {
                let leaving_random = mode == PlayMode::Random;
                mode = mode.next();
                if leaving_random {
                    history.clear();
                }
            }
            1 => {
                size = usize::from(byte / 5 % 32);
                history.clear();
                current = None;
            }
            2 => current = Some(usize::from(*byte)),
            _ => {
                let direction = if byte % 5 == 3 {
                    Direction::Next
                } else {
                    Direction::Previous
                };
                let target = target_index(mode, current, size, &mut history, direction, &mut rng);
                if let Some(index) = target {
                    assert!(index < size, "{index} out of range for {size}");
                    current = Some(index);
                }
                assert!(history.len() <= size);
            }
        }
    }
});
