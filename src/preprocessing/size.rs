//! Size label normalisation.
//!
//! Accessories are always `ONE SIZE`. With normalisation enabled, a size
//! label is replaced by its relative position (0 to 1) within its size
//! chart, written with two decimals, so that e.g. `M` in tops and `32` in
//! bottoms become comparable. Labels on no chart become `unknown`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

pub const ONE_SIZE: &str = "ONE SIZE";
pub const UNKNOWN_SIZE: &str = "unknown";
const ACCESSORIES: &str = "accessories";

const TOPS_CHART: [&str; 10] = ["XXS", "XS", "S", "M", "L", "XL", "XXL", "3XL", "4XL", ONE_SIZE];

fn size_charts() -> Vec<Vec<String>> {
    let tops = TOPS_CHART.iter().map(|s| s.to_string()).collect();
    let bottoms = (22..45).map(|i| i.to_string()).collect();
    let footwear = (4..16).map(|i| i.to_string()).collect();
    let tailoring = (34..55)
        .step_by(2)
        .flat_map(|i| ["S", "R", "L"].into_iter().map(move |j| format!("{}{}", i, j)))
        .collect();
    vec![tops, bottoms, footwear, tailoring]
}

fn chart_positions() -> &'static HashMap<String, f64> {
    static POSITIONS: OnceLock<HashMap<String, f64>> = OnceLock::new();
    POSITIONS.get_or_init(|| {
        let mut positions = HashMap::new();
        for chart in size_charts() {
            let last = (chart.len() - 1).max(1) as f64;
            for (i, label) in chart.into_iter().enumerate() {
                positions.insert(label, i as f64 / last);
            }
        }
        positions
    })
}

/// Stateless size normaliser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeNormalizer {
    normalize: bool,
}

impl SizeNormalizer {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }

    pub fn normalizes(&self) -> bool {
        self.normalize
    }

    /// Normalised label for one listing.
    pub fn apply(&self, size: &str, category: &str) -> String {
        let label = if category == ACCESSORIES { ONE_SIZE } else { size };
        if !self.normalize {
            return label.to_string();
        }
        match chart_positions().get(label) {
            Some(position) => format!("{:.2}", position),
            None => UNKNOWN_SIZE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessories_forced_to_one_size() {
        let n = SizeNormalizer::new(false);
        assert_eq!(n.apply("M", "accessories"), ONE_SIZE);
        assert_eq!(n.apply("M", "tops"), "M");
    }

    #[test]
    fn test_normalized_chart_positions() {
        let n = SizeNormalizer::new(true);
        assert_eq!(n.apply("XXS", "tops"), "0.00");
        assert_eq!(n.apply("ONE SIZE", "tops"), "1.00");
        assert_eq!(n.apply("anything", "accessories"), "1.00");
        assert_eq!(n.apply("22", "bottoms"), "0.00");
        assert_eq!(n.apply("44", "bottoms"), "1.00");
        assert_eq!(n.apply("54L", "tailoring"), "1.00");
        assert_eq!(n.apply("34S", "tailoring"), "0.00");
    }

    #[test]
    fn test_off_chart_is_unknown() {
        let n = SizeNormalizer::new(true);
        assert_eq!(n.apply("XXXXL", "tops"), UNKNOWN_SIZE);
    }

    #[test]
    fn test_chart_positions_are_evenly_spaced() {
        let n = SizeNormalizer::new(true);
        // 12 footwear sizes from 4 to 15
        assert_eq!(n.apply("5", "footwear"), format!("{:.2}", 1.0 / 11.0));
        assert_eq!(n.apply("M", "tops"), format!("{:.2}", 3.0 / 9.0));
    }
}
