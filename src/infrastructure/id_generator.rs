// Entity ID Generator - Snowflake-like, time-ordered 64-bit IDs
// Newer documents always sort after older ones, which the feed queries use as a tie-break

use std::sync::Mutex;

use crate::core::{current_time_millis, EntityId};

/// Custom epoch (2024-01-01T00:00:00Z) keeps IDs well inside the positive i64 range
const EPOCH_MILLIS: i64 = 1_704_067_200_000;
const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// 64-bit ID format: [timestamp:41][node_id:10][sequence:12]
/// 1024 nodes and 4096 IDs per millisecond per node
#[derive(Debug)]
pub struct EntityIdGenerator {
    node_id: u16,
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: i64,
    sequence: u64,
}

impl EntityIdGenerator {
    /// Node IDs above 1023 are masked to 10 bits
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id: node_id & MAX_NODE_ID,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    pub fn next_id(&self) -> EntityId {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut now = (current_time_millis() - EPOCH_MILLIS).max(0);
        // Clock went backwards: keep issuing from the last timestamp
        if now < state.last_timestamp {
            now = state.last_timestamp;
        }

        if now == state.last_timestamp {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond - borrow the next one
                now += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        let id = ((now as u64) << (NODE_BITS + SEQUENCE_BITS))
            | ((self.node_id as u64) << SEQUENCE_BITS)
            | state.sequence;

        EntityId(id as i64)
    }

    pub fn extract_node_id(id: EntityId) -> u16 {
        ((id.value() as u64 >> SEQUENCE_BITS) & MAX_NODE_ID as u64) as u16
    }

    /// Milliseconds since the Unix epoch at which the ID was minted
    pub fn extract_timestamp(id: EntityId) -> i64 {
        (id.value() as u64 >> (NODE_BITS + SEQUENCE_BITS)) as i64 + EPOCH_MILLIS
    }

    pub fn extract_sequence(id: EntityId) -> u16 {
        (id.value() as u64 & MAX_SEQUENCE) as u16
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let generator = EntityIdGenerator::new(123);

        let ids: Vec<EntityId> = (0..1000).map(|_| generator.next_id()).collect();

        // Strictly increasing, hence unique
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(ids.iter().all(|id| id.is_valid()));
        assert!(ids
            .iter()
            .all(|id| EntityIdGenerator::extract_node_id(*id) == 123));
    }

    #[test]
    fn test_timestamp_extraction() {
        let generator = EntityIdGenerator::new(5);
        let before = current_time_millis();
        let id = generator.next_id();
        let after = current_time_millis();

        let minted = EntityIdGenerator::extract_timestamp(id);
        assert!(minted >= before && minted <= after + 1);
        assert_eq!(generator.node_id(), 5);
    }

    #[test]
    fn test_node_id_is_masked() {
        let generator = EntityIdGenerator::new(2048 + 7);
        assert_eq!(generator.node_id(), 7);
    }
}
