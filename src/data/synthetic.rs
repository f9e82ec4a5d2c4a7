//! Deterministic synthetic listings.
//!
//! Log price is linear in `n_photos` plus additive designer, category and
//! condition-grade effects and a small uniform noise term. Text fields are
//! generated from the same attributes, so they carry signal but no extra
//! randomness beyond which rows leave a field empty.

use super::{Dataset, Listing};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Log-price intercept.
pub const BASE_LOG_PRICE: f64 = 3.2;
/// Log-price increase per listing photo.
pub const PHOTO_EFFECT: f64 = 0.12;
/// Log-price increase per condition grade.
pub const GRADE_EFFECT: f64 = 0.1;
/// Half-width of the uniform log-price noise.
pub const NOISE: f64 = 0.08;

const DESIGNERS: [(&str, f64); 6] = [
    ("Prada", 0.6),
    ("Gucci", 0.5),
    ("Rick Owens", 0.7),
    ("Acne Studios", 0.2),
    ("Carhartt", -0.1),
    ("Uniqlo", -0.4),
];

struct CategorySpec {
    name: &'static str,
    effect: f64,
    items: &'static [(&'static str, &'static str)],
    sizes: &'static [&'static str],
}

const CATEGORIES: [CategorySpec; 5] = [
    CategorySpec {
        name: "tops",
        effect: 0.0,
        items: &[("shirts", "shirt"), ("sweaters", "sweater"), ("t-shirts", "tee")],
        sizes: &["XS", "S", "M", "L", "XL"],
    },
    CategorySpec {
        name: "bottoms",
        effect: 0.05,
        items: &[("jeans", "jeans"), ("trousers", "trousers"), ("shorts", "shorts")],
        sizes: &["28", "30", "32", "34", "36"],
    },
    CategorySpec {
        name: "footwear",
        effect: 0.2,
        items: &[("sneakers", "sneaker"), ("boots", "boot")],
        sizes: &["8", "9", "10", "11", "12"],
    },
    CategorySpec {
        name: "outerwear",
        effect: 0.3,
        items: &[("jackets", "jacket"), ("coats", "coat")],
        sizes: &["S", "M", "L", "XL"],
    },
    CategorySpec {
        name: "accessories",
        effect: -0.2,
        items: &[("bags", "bag"), ("hats", "hat"), ("belts", "belt")],
        sizes: &["ONE SIZE"],
    },
];

const DEPARTMENTS: [&str; 2] = ["menswear", "womenswear"];
const COLORS: [&str; 6] = ["black", "white", "navy", "grey", "olive", "red"];

/// Condition labels with the phrase used in generated descriptions, worst grade first.
const CONDITIONS: [(&str, &str); 4] = [
    ("Worn", "well worn visible fading"),
    ("Used", "used good condition light wear"),
    ("Gently Used", "gently used excellent condition"),
    ("New", "brand new with tags never worn"),
];

/// Generate `n` listings with prices. The same `(n, seed)` always yields the same data.
pub fn generate(n: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut listings = Vec::with_capacity(n);
    let mut prices = Vec::with_capacity(n);

    for _ in 0..n {
        let (designer, designer_effect) = DESIGNERS[rng.gen_range(0..DESIGNERS.len())];
        let category = &CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        let (subcategory, noun) = category.items[rng.gen_range(0..category.items.len())];
        let size = category.sizes.choose(&mut rng).copied().unwrap_or("ONE SIZE");
        let department = DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())];
        let color = COLORS[rng.gen_range(0..COLORS.len())];
        let grade = rng.gen_range(0..CONDITIONS.len());
        let (condition, phrase) = CONDITIONS[grade];
        let n_photos = rng.gen_range(1..=12) as f64;

        let log_price = BASE_LOG_PRICE
            + PHOTO_EFFECT * n_photos
            + designer_effect
            + category.effect
            + GRADE_EFFECT * grade as f64
            + rng.gen_range(-NOISE..NOISE);

        let description = if rng.gen_bool(0.15) {
            String::new()
        } else {
            format!("{} {}", phrase, noun)
        };
        let hashtags = if rng.gen_bool(0.3) {
            String::new()
        } else {
            format!(
                "#{} #{}",
                designer.to_lowercase().replace(' ', ""),
                category.name
            )
        };

        let listing = Listing {
            category: Some(category.name.to_string()),
            subcategory: Some(subcategory.to_string()),
            department: Some(department.to_string()),
            designer: Some(designer.to_string()),
            size: Some(size.to_string()),
            color: Some(color.to_string()),
            condition: Some(condition.to_string()),
            n_photos: Some(n_photos),
            item_name: Some(format!("{} {} {}", designer, color, noun)),
            description: Some(description),
            hashtags: Some(hashtags),
        };
        listings.push(listing.clean());
        prices.push(log_price.exp());
    }

    Dataset { listings, prices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, TextField, MISSING_PLACEHOLDER};

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(20, 9);
        let b = generate(20, 9);
        assert_eq!(a.prices, b.prices);
        assert_eq!(a.listings, b.listings);
    }

    #[test]
    fn test_generate_prices_positive_and_fields_present() {
        let dataset = generate(200, 4);
        assert_eq!(dataset.len(), 200);
        for (listing, price) in dataset.listings.iter().zip(&dataset.prices) {
            assert!(*price > 0.0 && price.is_finite());
            for column in Column::ALL {
                if column.is_numeric() {
                    assert!(listing.numeric(column).is_ok());
                } else {
                    assert!(listing.categorical(column).is_ok());
                }
            }
            for field in TextField::ALL {
                assert!(!listing.text(field).unwrap().is_empty());
            }
        }
    }

    #[test]
    fn test_generate_leaves_some_text_missing() {
        let dataset = generate(200, 4);
        let missing = dataset
            .listings
            .iter()
            .filter(|l| l.text(TextField::Hashtags).unwrap() == MISSING_PLACEHOLDER)
            .count();
        assert!(missing > 0 && missing < 200);
    }

    #[test]
    fn test_accessories_are_one_size() {
        let dataset = generate(200, 11);
        for listing in &dataset.listings {
            if listing.categorical(Column::Category).unwrap() == "accessories" {
                assert_eq!(listing.categorical(Column::Size).unwrap(), "ONE SIZE");
            }
        }
    }
}
