//! Client-side document id generation.

use pipeline::RecordId;
use uuid::Uuid;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 20;

/// Generates a 20-character alphanumeric id in the style the store assigns
/// (collision probability is negligible at this length).
pub fn generate_document_id() -> RecordId {
    let mut entropy = Vec::with_capacity(32);
    entropy.extend_from_slice(Uuid::new_v4().as_bytes());
    entropy.extend_from_slice(Uuid::new_v4().as_bytes());

    let id: String = entropy
        .iter()
        .take(ID_LEN)
        .map(|b| ALPHABET[usize::from(*b) % ALPHABET.len()] as char)
        .collect();

    // ID_LEN > 0, so the generated string is never empty.
    RecordId::new(id).unwrap_or_else(|| unreachable!("generated id is non-empty"))
}
