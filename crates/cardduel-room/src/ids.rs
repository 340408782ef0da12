//! Room codes and player ids.

use cardduel_protocol::{PlayerId, RoomId};
use rand::seq::IndexedRandom;

/// Characters used in room codes. No `0/O` or `1/I` so codes can be
/// read aloud and typed without confusion.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LEN: usize = 6;

const PLAYER_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const PLAYER_ID_LEN: usize = 12;

/// Bound on collision retries when picking a new room code.
pub const MAX_ID_ATTEMPTS: usize = 16;

/// Source of candidate room codes.
///
/// The manager checks each candidate against live rooms, so an
/// implementation only needs to be random, not unique.
pub trait RoomCodes: Send + Sync + 'static {
    fn next_code(&self) -> RoomId;
}

/// Six random characters from an unambiguous alphabet.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRoomCodes;

impl RoomCodes for RandomRoomCodes {
    fn next_code(&self) -> RoomId {
        RoomId(random_string(ROOM_CODE_ALPHABET, ROOM_CODE_LEN))
    }
}

impl<F> RoomCodes for F
where
    F: Fn() -> RoomId + Send + Sync + 'static,
{
    fn next_code(&self) -> RoomId {
        self()
    }
}

/// A fresh player id: `p_` for humans, `bot_` for bots.
pub(crate) fn player_id(is_bot: bool) -> PlayerId {
    let prefix = if is_bot { "bot_" } else { "p_" };
    PlayerId(format!("{prefix}{}", random_string(PLAYER_ID_ALPHABET, PLAYER_ID_LEN)))
}

fn random_string(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .filter_map(|_| alphabet.choose(&mut rng).map(|b| *b as char))
        .collect()
}
