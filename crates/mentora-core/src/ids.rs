//! Identifier helpers.

use uuid::Uuid;

/// Time-ordered UUIDv7 for job ids, so queue rows sort chronologically in
/// logs and diagnostics.
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a unique certificate identifier for a completed enrollment.
///
/// Format: `CERT-` followed by a 12-hex-digit token, e.g. `CERT-9F0A1B2C3D4E`.
pub fn new_certificate_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("CERT-{}", raw[..12].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v7_ids_are_time_ordered() {
        let a = new_v7();
        let b = new_v7();
        assert!(a <= b);
    }

    #[test]
    fn certificate_id_shape() {
        let id = new_certificate_id();
        assert!(id.starts_with("CERT-"));
        assert_eq!(id.len(), "CERT-".len() + 12);
        assert!(id["CERT-".len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn certificate_ids_are_unique() {
        let a = new_certificate_id();
        let b = new_certificate_id();
        assert_ne!(a, b);
    }
}
