//! Record id generation
//!
//! Ids are short lowercase alphanumeric strings that always start with a
//! letter, so they render as bare SurrealDB record keys.

use rand::Rng;

/// Length of generated ids
pub const ID_LENGTH: usize = 12;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a new random record id.
pub fn generate() -> String {
    let mut rng = rand::rng();
    let mut id = String::with_capacity(ID_LENGTH);
    id.push(LETTERS[rng.random_range(0..LETTERS.len())] as char);
    for _ in 1..ID_LENGTH {
        id.push(ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())] as char);
    }
    id
}
