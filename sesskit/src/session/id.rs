use uuid::Uuid;

/// Creates a new session id.
///
/// UUIDv7 in simple form: 32 lowercase hex characters whose leading bits
/// encode a millisecond timestamp, so ids sort lexically by creation time.
/// The value is fixed-length and safe to use verbatim as a cookie value.
/// The uuid crate's generator is safe for concurrent use.
pub fn new_session_id() -> String {
    Uuid::now_v7().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_shape() {
        let id = new_session_id();

        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| new_session_id()).collect();

        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_ids_sort_by_creation_time() {
        let first = new_session_id();
        // UUIDv7 timestamps have millisecond resolution.
        std::thread::sleep(std::time::Duration::from_millis(3));
        let second = new_session_id();

        assert!(second > first);
    }

    #[test]
    fn test_concurrent_generation_is_unique() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| new_session_id()).collect::<Vec<_>>()))
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("generator thread panicked") {
                assert!(all.insert(id), "duplicate id across threads");
            }
        }
    }
}
