use crc32fast::Hasher;

/// Derive a diagram id seed from a section id using CRC32
pub fn section_seed(section_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(section_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential diagram id generator for one section
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // Section seed (CRC32)
    count: u32,   // Sequential counter
}

impl IdGenerator {
    pub fn new(section_id: &str) -> Self {
        Self {
            seed: section_seed(section_id),
            count: 0,
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Generate next sequential id
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Generate the next id for which `taken` is false
    ///
    /// A reopened section may already hold ids minted by an earlier session.
    pub fn new_unique_id<F>(&mut self, taken: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        loop {
            let id = self.new_id();
            if !taken(&id) {
                return id;
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
