//! Waypoint selection from a recorded path.

use crate::model::WorldPosition;

/// Evenly sample `n` stops from an ordered path.
///
/// For three or more stops the first and last path points are always
/// included. Rounding is half-away-from-zero on the real step product.
pub fn select_evenly(path: &[WorldPosition], n: usize) -> Vec<WorldPosition> {
    if path.is_empty() || n == 0 {
        return Vec::new();
    }
    if n >= path.len() {
        return path.to_vec();
    }
    if n == 1 {
        // Single stop: the path's midpoint.
        return vec![path[path.len() / 2]];
    }

    let step = if n == 2 {
        // Two stops: thirds of the path rather than the endpoints.
        path.len() as f64 / 3.0
    } else {
        (path.len() - 1) as f64 / (n - 1) as f64
    };

    (0..n)
        .map(|i| {
            let index = (i as f64 * step).round() as usize;
            path[index.min(path.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(len: usize) -> Vec<WorldPosition> {
        (0..len)
            .map(|i| WorldPosition::new(i as f64, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_empty_path_or_zero_count() {
        assert!(select_evenly(&[], 3).is_empty());
        assert!(select_evenly(&path(5), 0).is_empty());
    }

    #[test]
    fn test_count_at_least_path_length_returns_path() {
        let p = path(5);
        assert_eq!(select_evenly(&p, 5), p);
        assert_eq!(select_evenly(&p, 9), p);
    }

    #[test]
    fn test_single_stop_is_midpoint() {
        let p = path(10);
        let picked = select_evenly(&p, 1);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0], p[5]);

        let p = path(7);
        assert_eq!(select_evenly(&p, 1)[0], p[3]);
    }

    #[test]
    fn test_two_stops_use_thirds() {
        let p = path(9);
        // step = 3.0 -> indices 0 and 3.
        let picked = select_evenly(&p, 2);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0], p[0]);
        assert_eq!(picked[1], p[3]);
    }

    #[test]
    fn test_three_or_more_stops_include_endpoints() {
        for len in [5usize, 10, 37, 100] {
            for n in 3..5 {
                let p = path(len);
                let picked = select_evenly(&p, n);
                assert_eq!(picked.len(), n);
                assert_eq!(picked[0], p[0]);
                assert_eq!(*picked.last().unwrap(), p[len - 1]);
            }
        }
    }

    #[test]
    fn test_result_length_matches_request() {
        for len in 1..20usize {
            for n in 1..=len {
                assert_eq!(select_evenly(&path(len), n).len(), n);
            }
        }
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        // len 4, n 3: step 1.5 -> indices round(0), round(1.5), round(3)
        // = 0, 2, 3.
        let p = path(4);
        let picked = select_evenly(&p, 3);
        assert_eq!(picked, vec![p[0], p[2], p[3]]);
    }
}
