use chrono::{DateTime, Utc};

/// The staleness gate: is a device's mutation older than the server row?
///
/// This is the single place the last-write-wins-by-timestamp policy
/// lives. Callers never compare `updated_at` values themselves, so the
/// policy can be replaced (version vector, monotonic counter) without
/// touching them.
///
/// A mutation that carries no base version is stale: the device never
/// saw a server copy of the row it is trying to change.
pub fn is_stale(base: Option<DateTime<Utc>>, current: DateTime<Utc>) -> bool {
    match base {
        Some(base) => current > base,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn equal_versions_are_fresh() {
        let t = Utc::now();
        assert!(!is_stale(Some(t), t));
    }

    #[test]
    fn newer_server_version_is_stale() {
        let base = Utc::now();
        assert!(is_stale(Some(base), base + Duration::milliseconds(1)));
    }

    #[test]
    fn newer_base_is_fresh() {
        // Device clock ahead of the server: not a conflict.
        let current = Utc::now();
        assert!(!is_stale(Some(current + Duration::seconds(5)), current));
    }

    #[test]
    fn missing_base_is_stale() {
        assert!(is_stale(None, Utc::now()));
    }
}
