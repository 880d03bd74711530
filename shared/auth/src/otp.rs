use chrono::{DateTime, Utc};
use rand::Rng;

/// Four digit one-time codes used for password resets.
pub struct OtpService;

impl OtpService {
    pub fn generate() -> String {
        rand::thread_rng().gen_range(1000..=9999).to_string()
    }

    pub fn verify(
        stored: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        provided: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match (stored, expires_at) {
            (Some(code), Some(expiry)) => code == provided.trim() && now <= expiry,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_generated_code_is_four_digits() {
        for _ in 0..100 {
            let code = OtpService::generate();
            let value: u32 = code.parse().unwrap();
            assert_eq!(code.len(), 4);
            assert!((1000..=9999).contains(&value));
        }
    }

    #[test]
    fn test_verify() {
        let now = Utc::now();
        let later = now + Duration::minutes(15);

        assert!(OtpService::verify(Some("4821"), Some(later), "4821", now));
        assert!(OtpService::verify(Some("4821"), Some(later), " 4821 ", now));
        assert!(!OtpService::verify(Some("4821"), Some(later), "4822", now));
        assert!(!OtpService::verify(Some("4821"), Some(now - Duration::minutes(1)), "4821", now));
        assert!(!OtpService::verify(None, Some(later), "4821", now));
    }
}
