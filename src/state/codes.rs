//! Candidate game codes and routing keys
//!
//! Both are drawn uniformly at random; uniqueness against active sessions
//! is enforced by the store's atomic create, with the bounded retry loop in
//! `create_session`.

use rand::Rng;

use crate::types::{GameCode, GAME_CODE_MAX, GAME_CODE_MIN};

/// Alphanumeric alphabet for routing keys (62^24 possible keys, so the key
/// also works as a non-guessable room authorization token)
const KEY_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ROUTING_KEY_LENGTH: usize = 24;

/// Draw a candidate 6-digit game code
pub fn random_game_code() -> GameCode {
    rand::rng().random_range(GAME_CODE_MIN..=GAME_CODE_MAX)
}

/// Draw a candidate routing key
pub fn random_routing_key() -> String {
    let mut rng = rand::rng();
    (0..ROUTING_KEY_LENGTH)
        .map(|_| KEY_CHARS[rng.random_range(0..KEY_CHARS.len())] as char)
        .collect()
}
