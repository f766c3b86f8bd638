use thiserror::Error;

use crate::auth::repo_types::User;

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("descriptor dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("{0}")]
    InvalidInput(&'static str),
}

/// Euclidean distance between two equal-length descriptors.
pub fn distance(a: &[f32], b: &[f32]) -> Result<f32, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    Ok(sum.sqrt())
}

/// Compares face descriptors under a fixed Euclidean distance threshold.
///
/// The threshold is injected at construction so it can be tuned per
/// deployment and exercised directly in tests.
#[derive(Debug, Clone, Copy)]
pub struct FaceMatcher {
    threshold: f32,
}

impl FaceMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Two descriptors match when their distance is strictly below the
    /// threshold. A distance exactly equal to the threshold is not a match.
    pub fn is_match(&self, a: &[f32], b: &[f32]) -> Result<bool, MatchError> {
        Ok(distance(a, b)? < self.threshold)
    }

    /// Scans every enrolled descriptor of every user against every candidate
    /// descriptor and returns the first user whose face is within threshold,
    /// or `None` when no combination matches.
    ///
    /// First match short-circuits; which user is reported depends only on
    /// enumeration order. O(users x stored x candidates), acceptable at the
    /// small population scale this service targets.
    pub fn check_duplicate<'a>(
        &self,
        candidates: &[Vec<f32>],
        users: &'a [User],
    ) -> Result<Option<&'a User>, MatchError> {
        if candidates.is_empty() || candidates.iter().any(|c| c.is_empty()) {
            return Err(MatchError::InvalidInput(
                "at least one non-empty face descriptor is required",
            ));
        }
        for user in users {
            for stored in user.face_descriptors.iter() {
                for incoming in candidates {
                    if self.is_match(stored, incoming)? {
                        return Ok(Some(user));
                    }
                }
            }
        }
        Ok(None)
    }

    /// 1:N identification: returns the first user with a stored descriptor
    /// within threshold of the probe, in enumeration order, or `None`.
    pub fn identify<'a>(
        &self,
        probe: &[f32],
        users: &'a [User],
    ) -> Result<Option<&'a User>, MatchError> {
        if probe.is_empty() {
            return Err(MatchError::InvalidInput("missing or invalid face descriptor"));
        }
        for user in users {
            for stored in user.face_descriptors.iter() {
                if self.is_match(stored, probe)? {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user_with(descriptors: Vec<Vec<f32>>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "test".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "hash".into(),
            face_descriptors: Json(descriptors),
            otp: None,
            otp_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = vec![0.3f32, -1.2, 0.0, 4.5];
        assert_eq!(distance(&a, &a).unwrap(), 0.0);
        assert!(FaceMatcher::new(0.001).is_match(&a, &a).unwrap());
    }

    #[test]
    fn distance_is_euclidean() {
        let a = [0.0f32, 0.0];
        let b = [3.0f32, 4.0];
        assert!((distance(&a, &b).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn distance_rejects_unequal_lengths() {
        let err = distance(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            MatchError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn exact_threshold_is_not_a_match() {
        // 0.5 is exact in f32, so distance([0.0], [0.5]) lands exactly on
        // the boundary
        let matcher = FaceMatcher::new(0.5);
        let a = [0.0f32];
        let b = [0.5f32];
        assert_eq!(distance(&a, &b).unwrap(), 0.5);
        assert!(!matcher.is_match(&a, &b).unwrap());
        // just inside the boundary matches
        assert!(matcher.is_match(&a, &[0.4f32]).unwrap());
    }

    #[test]
    fn check_duplicate_finds_near_face_regardless_of_owner() {
        let matcher = FaceMatcher::new(0.45);
        let users = vec![
            user_with(vec![vec![5.0, 5.0]]),
            user_with(vec![vec![0.1, 0.1]]),
        ];
        // candidate at distance 0.1 from the second user's descriptor
        let dup = matcher
            .check_duplicate(&[vec![0.1, 0.2]], &users)
            .unwrap()
            .expect("duplicate expected");
        assert_eq!(dup.id, users[1].id);
    }

    #[test]
    fn check_duplicate_accepts_distant_faces() {
        let matcher = FaceMatcher::new(0.45);
        let users = vec![user_with(vec![vec![0.1, 0.1]])];
        // distance 0.9 from the only stored descriptor
        let result = matcher
            .check_duplicate(&[vec![0.1, 1.0]], &users)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn check_duplicate_requires_candidates() {
        let matcher = FaceMatcher::new(0.45);
        let err = matcher.check_duplicate(&[], &[]).unwrap_err();
        assert!(matches!(err, MatchError::InvalidInput(_)));
        let err = matcher.check_duplicate(&[vec![]], &[]).unwrap_err();
        assert!(matches!(err, MatchError::InvalidInput(_)));
    }

    #[test]
    fn identify_returns_first_user_within_threshold() {
        let matcher = FaceMatcher::new(0.45);
        let users = vec![
            user_with(vec![vec![3.0, 3.0]]),
            user_with(vec![vec![0.1, 0.1]]),
            // also within threshold of the probe, but enumerated later
            user_with(vec![vec![0.1, 0.15]]),
        ];
        let found = matcher
            .identify(&[0.1, 0.12], &users)
            .unwrap()
            .expect("match expected");
        assert_eq!(found.id, users[1].id);
    }

    #[test]
    fn identify_rejects_far_probe() {
        let matcher = FaceMatcher::new(0.45);
        let users = vec![
            user_with(vec![vec![0.1, 0.1]]),
            user_with(vec![vec![1.0, 1.0]]),
        ];
        assert!(matcher.identify(&[10.0, 10.0], &users).unwrap().is_none());
    }

    #[test]
    fn identify_rejects_empty_probe() {
        let matcher = FaceMatcher::new(0.45);
        let err = matcher.identify(&[], &[]).unwrap_err();
        assert!(matches!(err, MatchError::InvalidInput(_)));
    }

    #[test]
    fn identify_propagates_dimension_mismatch() {
        let matcher = FaceMatcher::new(0.45);
        let users = vec![user_with(vec![vec![0.1, 0.1, 0.1]])];
        let err = matcher.identify(&[0.1, 0.1], &users).unwrap_err();
        assert!(matches!(err, MatchError::DimensionMismatch { .. }));
    }
}
