// crates/statedb/core/src/rawdb/mod.rs
//
// Legacy freezer offset schema.
//
// An offline pruning run truncates old ancient data and records how many
// items were dropped as an "offset"; every later read of the ancient store
// adds this offset back so item numbering stays stable across pruning.
// These markers were written by earlier database versions and must keep
// their exact key strings and number encoding, otherwise an upgraded node
// silently reads offset 0 and serves misnumbered history.
//
// Reads are forgiving: a missing or undecodable marker means "never pruned"
// and defaults to zero. Writes are not: losing a marker after a prune has
// physically deleted data corrupts the numbering forever, so write failures
// are routed to the crit policy and do not return.

use statedb_common::{CritPolicy, KeyValueStore, StoreError, StoreResult};

/// Marker for the number of items already frozen into the ancient store
pub const FROZEN_OF_ANCIENT_DB_KEY: &[u8] = b"FrozenOfAncientDB";

/// Marker recording which freezer type the database was opened with
pub const PRUNE_ANCIENT_FLAG_KEY: &[u8] = b"PruneAncientFlag";

/// Offset of the current ancient freezer (items pruned so far)
pub const OFFSET_OF_CURRENT_ANCIENT_FREEZER_KEY: &[u8] = b"offSetOfCurrentAncientFreezer";

/// Offset of the previous ancient freezer, kept while a prune is in flight
pub const OFFSET_OF_LAST_ANCIENT_FREEZER_KEY: &[u8] = b"offSetOfLastAncientFreezer";

/// Ancient store keeps full history
pub const ENTIRE_FREEZER_TYPE: u64 = 0;

/// Ancient store has been pruned
pub const PRUNE_FREEZER_TYPE: u64 = 1;

/// Encode an offset as a minimal big-endian integer
///
/// Leading zero bytes are stripped, so zero encodes as the empty byte
/// string. This matches the arbitrary-precision encoding the markers were
/// originally written with.
fn encode_offset(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Decode a minimal big-endian integer, rejecting values beyond u64
fn decode_offset(data: &[u8]) -> StoreResult<u64> {
    let first = data.iter().position(|&b| b != 0).unwrap_or(data.len());
    let digits = &data[first..];
    if digits.len() > 8 {
        return Err(StoreError::Backend(format!("offset value overflows u64: {} bytes", digits.len())));
    }
    Ok(digits.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

fn read_offset<DB: KeyValueStore>(db: &DB, key: &[u8]) -> u64 {
    match db.get(key) {
        Ok(Some(data)) => decode_offset(&data).unwrap_or(0),
        _ => 0,
    }
}

/// Read the number of items frozen into the ancient store, 0 if unset
pub fn read_frozen_of_ancient_freezer<DB: KeyValueStore>(db: &DB) -> u64 {
    read_offset(db, FROZEN_OF_ANCIENT_DB_KEY)
}

/// Record the number of items frozen into the ancient store
pub fn write_frozen_of_ancient_freezer<DB: KeyValueStore>(db: &DB, crit: &dyn CritPolicy, frozen: u64) {
    if let Err(err) = db.put(FROZEN_OF_ANCIENT_DB_KEY, &encode_offset(frozen)) {
        crit.crit("Failed to store the ancient frozen number", &err);
    }
}

/// Read which freezer type the database was opened with
///
/// Databases that predate the marker default to [`ENTIRE_FREEZER_TYPE`].
pub fn read_ancient_type<DB: KeyValueStore>(db: &DB) -> u64 {
    match db.get(PRUNE_ANCIENT_FLAG_KEY) {
        Ok(Some(data)) => decode_offset(&data).unwrap_or(ENTIRE_FREEZER_TYPE),
        _ => ENTIRE_FREEZER_TYPE,
    }
}

/// Record which freezer type the database is opened with
pub fn write_ancient_type<DB: KeyValueStore>(db: &DB, crit: &dyn CritPolicy, freezer_type: u64) {
    if let Err(err) = db.put(PRUNE_ANCIENT_FLAG_KEY, &encode_offset(freezer_type)) {
        crit.crit("Failed to store prune ancient type", &err);
    }
}

/// Read the current freezer offset, 0 if the store was never pruned
pub fn read_offset_of_current_ancient_freezer<DB: KeyValueStore>(db: &DB) -> u64 {
    read_offset(db, OFFSET_OF_CURRENT_ANCIENT_FREEZER_KEY)
}

/// Record the current freezer offset
pub fn write_offset_of_current_ancient_freezer<DB: KeyValueStore>(db: &DB, crit: &dyn CritPolicy, offset: u64) {
    if let Err(err) = db.put(OFFSET_OF_CURRENT_ANCIENT_FREEZER_KEY, &encode_offset(offset)) {
        crit.crit("Failed to store the current offset of ancient", &err);
    }
}

/// Read the previous freezer offset, 0 if unset
pub fn read_offset_of_last_ancient_freezer<DB: KeyValueStore>(db: &DB) -> u64 {
    read_offset(db, OFFSET_OF_LAST_ANCIENT_FREEZER_KEY)
}

/// Record the previous freezer offset before a prune moves the current one
pub fn write_offset_of_last_ancient_freezer<DB: KeyValueStore>(db: &DB, crit: &dyn CritPolicy, offset: u64) {
    if let Err(err) = db.put(OFFSET_OF_LAST_ANCIENT_FREEZER_KEY, &encode_offset(offset)) {
        crit.crit("Failed to store the old offset of ancient", &err);
    }
}

/// Effective legacy offset for databases written by older versions
///
/// Older releases stored the pruned-item count under the frozen marker
/// instead of the current-offset marker; the larger of the two is the
/// offset actually in effect.
pub fn read_legacy_offset<DB: KeyValueStore>(db: &DB) -> u64 {
    let frozen = read_frozen_of_ancient_freezer(db);
    let current = read_offset_of_current_ancient_freezer(db);
    frozen.max(current)
}

/// Remove every legacy offset marker
///
/// Run once after a migration has folded the legacy offsets into the new
/// schema; stale markers would otherwise shadow the migrated values.
pub fn clean_legacy_offset<DB: KeyValueStore>(db: &DB, crit: &dyn CritPolicy) {
    for key in [
        FROZEN_OF_ANCIENT_DB_KEY,
        PRUNE_ANCIENT_FLAG_KEY,
        OFFSET_OF_CURRENT_ANCIENT_FREEZER_KEY,
        OFFSET_OF_LAST_ANCIENT_FREEZER_KEY,
    ] {
        if let Err(err) = db.delete(key) {
            crit.crit("Failed to clean the legacy offsets of ancient", &err);
        }
    }
}
