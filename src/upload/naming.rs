//! Object key generation
//!
//! Keys are ULIDs from one monotonic generator, so two uploads from the same
//! process never share a key and later keys always sort after earlier ones.

use crate::utils::error::{AppError, AppResult};
use parking_lot::Mutex;
use ulid::Generator;

/// Container extension of every uploaded object
pub const OBJECT_EXTENSION: &str = "webm";

/// Content type of every uploaded object
pub const CONTENT_TYPE: &str = "video/webm";

pub struct ObjectNamer {
    generator: Mutex<Generator>,
}

impl ObjectNamer {
    pub fn new() -> Self {
        Self {
            generator: Mutex::new(Generator::new()),
        }
    }

    /// Next key, e.g. `01HV6Z3R8Q4Y2T9B7W5K1M0N3P.webm`
    pub fn next_key(&self) -> AppResult<String> {
        let id = self
            .generator
            .lock()
            .generate()
            .map_err(|e| AppError::UploadFailed(format!("Failed to generate object name: {}", e)))?;
        Ok(format!("{}.{}", id, OBJECT_EXTENSION))
    }
}

impl Default for ObjectNamer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct_and_increasing() {
        let namer = ObjectNamer::new();
        let keys: Vec<String> = (0..1000).map(|_| namer.next_key().unwrap()).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_key_shape() {
        let key = ObjectNamer::new().next_key().unwrap();
        assert!(key.ends_with(".webm"));
        assert_eq!(key.len(), 26 + ".webm".len());
    }
}
