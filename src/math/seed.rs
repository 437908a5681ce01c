use rand::SeedableRng;
use rand_pcg::Pcg32;

struct Fnv64 {
    hash: u64,
}

impl Fnv64 {
    fn new() -> Self {
        Self {
            hash: 0xcbf29ce484222325,
        }
    }

    fn update(&mut self, data: &[u8]) {
        let mut h = self.hash;
        for &b in data {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        self.hash = h;
    }

    fn finish(&self) -> u64 {
        self.hash
    }
}

pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = Fnv64::new();
    hasher.update(data);
    hasher.finish()
}

/// Seed for one permutation draw, stable across processes and call order.
pub fn derive_seed(base: u64, assay_id: &str, group: usize, repetition: usize) -> u64 {
    let mut hasher = Fnv64::new();
    hasher.update(&base.to_le_bytes());
    hasher.update(assay_id.as_bytes());
    hasher.update(&[0xff]);
    hasher.update(&(group as u64).to_le_bytes());
    hasher.update(&(repetition as u64).to_le_bytes());
    hasher.finish()
}

pub fn rng_for(base: u64, assay_id: &str, group: usize, repetition: usize) -> Pcg32 {
    Pcg32::seed_from_u64(derive_seed(base, assay_id, group, repetition))
}
