use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::Result;
use crate::db::Db;
use crate::queries::distinct_inferred_cpv_codes;

/// Process-wide cache of the 4-char CPV prefixes taken from every active
/// profile's inferred-CPV list. Populated lazily on first call; explicitly
/// invalidated by the caller whenever a profile is created or updated.
#[derive(Clone)]
pub struct InterestMesh {
	prefixes: Arc<RwLock<Option<Arc<HashSet<String>>>>>,
}

impl InterestMesh {
	pub fn new() -> Self {
		Self { prefixes: Arc::new(RwLock::new(None)) }
	}

	/// Returns the cached prefix set, populating it from storage on first
	/// call. A notice with no CPV codes matches the mesh unconditionally;
	/// the caller applies that neutral-fallback rule, not this type.
	pub async fn cpv_prefixes(&self, db: &Db) -> Result<Arc<HashSet<String>>> {
		if let Some(cached) = self.prefixes.read().expect("Interest Mesh lock poisoned.").clone() {
			return Ok(cached);
		}

		let codes = distinct_inferred_cpv_codes(db).await?;
		let fresh: Arc<HashSet<String>> =
			Arc::new(codes.iter().filter(|code| code.len() >= 4).map(|code| code[..4].to_string()).collect());

		*self.prefixes.write().expect("Interest Mesh lock poisoned.") = Some(fresh.clone());

		Ok(fresh)
	}

	/// Drops the cached prefix set; the next `cpv_prefixes` call rebuilds it.
	pub fn invalidate(&self) {
		*self.prefixes.write().expect("Interest Mesh lock poisoned.") = None;
	}
}

impl Default for InterestMesh {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_empty_and_invalidate_is_idempotent() {
		let mesh = InterestMesh::new();

		assert!(mesh.prefixes.read().unwrap().is_none());
		mesh.invalidate();
		assert!(mesh.prefixes.read().unwrap().is_none());
	}
}
