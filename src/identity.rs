//! Holder identity generation.

use rand::RngCore;
use uuid::Builder;

/// Build a holder identity of the form `"{instance_label}-{uuid}"`.
///
/// The UUID uses the version 4 layout with its 16 bytes drawn from `rng`, so
/// identities are unique per call in production and reproducible under a
/// seeded generator.
pub fn generate_identity<R: RngCore + ?Sized>(instance_label: &str, rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    let id = Builder::from_random_bytes(bytes).into_uuid();
    format!("{instance_label}-{id}")
}
