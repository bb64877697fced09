use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().build(manager)?;
    Ok(pool)
}

/// Compares two secrets without short-circuiting on the first differing
/// byte, so the comparison time does not leak how much of the key matched.
pub fn timing_safe_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_safe_eq_matches() {
        assert!(timing_safe_eq("secret", "secret"));
    }

    #[test]
    fn test_timing_safe_eq_rejects_differing_values() {
        assert!(!timing_safe_eq("secret", "secres"));
        assert!(!timing_safe_eq("secret", "secret2"));
        assert!(!timing_safe_eq("", "x"));
    }
}
