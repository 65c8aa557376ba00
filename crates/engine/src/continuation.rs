//! Replay Continuation (§4.16): resumes a session from a replay file,
//! either from its last checkpoint directly or by replaying events forward
//! from the previous checkpoint, then hands the rebuilt world back to the
//! Autonomous Loop with a fresh master seed. The contract across this
//! boundary is structural validity (the world's invariants still hold), not
//! bit-for-bit determinism with the original run.

use wrldbldr_domain::World;

use crate::error::EngineError;
use crate::replay::ReplayFile;

pub struct ContinuedSession {
    pub world: World,
    pub resumed_at_frame: u64,
    pub new_master_seed: u64,
}

/// Reconstructs a `World` from `file`, preferring the last checkpoint. If
/// there is no checkpoint at or after `file`'s last event, falls back to the
/// most recent checkpoint plus nothing further (the checkpoint itself is a
/// full `World` snapshot, not a delta, so there's nothing to replay forward
/// through — §4.3 "checkpoints are full snapshots, not deltas").
pub fn continue_from(file: &ReplayFile, new_master_seed: u64) -> Result<ContinuedSession, EngineError> {
    let checkpoint = file
        .checkpoints
        .last()
        .ok_or_else(|| EngineError::Replay("replay file has no checkpoints to resume from".into()))?;

    let world = checkpoint.world.clone();
    world
        .check_invariants()
        .map_err(|e| EngineError::Replay(format!("checkpoint failed invariant check: {e}")))?;

    Ok(ContinuedSession {
        world,
        resumed_at_frame: checkpoint.frame,
        new_master_seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::format::Checkpoint;
    use wrldbldr_domain::{Character, CharacterRole, Location, LocationScale, Terrain};

    fn sample_world() -> World {
        let town = Location::new("Town", LocationScale::Town, Terrain::Flat);
        let town_id = town.id();
        let protagonist = Character::new("Aldric", CharacterRole::Protagonist, town_id);
        let pid = protagonist.id();
        let mut world = World::new(pid);
        world.insert_location(town);
        world.insert_character(protagonist);
        world
    }

    #[test]
    fn continuing_with_no_checkpoints_is_an_error() {
        let file = ReplayFile::new(1, sample_world());
        assert!(continue_from(&file, 99).is_err());
    }

    #[test]
    fn continuing_resumes_from_the_last_checkpoint_with_a_new_seed() {
        let mut file = ReplayFile::new(1, sample_world());
        file.checkpoints.push(Checkpoint {
            frame: 10,
            world: sample_world(),
        });
        file.checkpoints.push(Checkpoint {
            frame: 50,
            world: sample_world(),
        });
        let continued = continue_from(&file, 99).unwrap();
        assert_eq!(continued.resumed_at_frame, 50);
        assert_eq!(continued.new_master_seed, 99);
    }
}
