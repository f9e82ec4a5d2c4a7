//! Listing records and dataset utilities.
//!
//! A [`Listing`] is one marketplace item: tabular attributes plus three free
//! text fields. Every field is optional so that payloads with absent fields
//! can be represented and rejected explicitly at transform time instead of
//! being silently zero-filled.
//!
//! # Example
//!
//! ```rust
//! use resale_pricer::data::{Column, Listing, TextField};
//!
//! let listing = Listing::default()
//!     .with_categorical(Column::Designer, "Prada")
//!     .with_numeric(Column::NPhotos, 6.0)
//!     .with_text(TextField::Description, "");
//!
//! let cleaned = listing.clean();
//! assert_eq!(cleaned.categorical(Column::Designer).unwrap(), "Prada");
//! assert_eq!(cleaned.text(TextField::Description).unwrap(), "missing");
//! ```

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod loader;
pub mod split;
pub mod synthetic;

pub use loader::{from_reader, read_csv};
pub use split::{train_eval_test_split, SplitRatios, Splits};

/// Placeholder written in place of absent or empty text.
pub const MISSING_PLACEHOLDER: &str = "missing";

/// Tabular columns of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Category,
    Subcategory,
    Department,
    Designer,
    Size,
    Color,
    Condition,
    NPhotos,
}

impl Column {
    /// Every tabular column, in schema order.
    pub const ALL: [Column; 8] = [
        Column::Category,
        Column::Subcategory,
        Column::Department,
        Column::Designer,
        Column::Size,
        Column::Color,
        Column::Condition,
        Column::NPhotos,
    ];

    /// Canonical column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Category => "category",
            Column::Subcategory => "subcategory",
            Column::Department => "department",
            Column::Designer => "designer",
            Column::Size => "size",
            Column::Color => "color",
            Column::Condition => "condition",
            Column::NPhotos => "n_photos",
        }
    }

    /// Whether the column holds a number rather than a category label.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::NPhotos)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PipelineError::Configuration(format!("unknown tabular column '{}'", s)))
    }
}

/// Free-text fields of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    ItemName,
    Description,
    Hashtags,
}

impl TextField {
    pub const ALL: [TextField; 3] = [TextField::ItemName, TextField::Description, TextField::Hashtags];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::ItemName => "item_name",
            TextField::Description => "description",
            TextField::Hashtags => "hashtags",
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextField {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        TextField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| PipelineError::Configuration(format!("unknown text field '{}'", s)))
    }
}

/// One marketplace listing (features only; the sold price travels separately).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listing {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub department: Option<String>,
    pub designer: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub n_photos: Option<f64>,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub hashtags: Option<String>,
}

impl Listing {
    /// Set a categorical column.
    ///
    /// Setting [`Column::NPhotos`] parses the value as a number; an
    /// unparsable value leaves the field absent.
    pub fn with_categorical(mut self, column: Column, value: impl Into<String>) -> Self {
        let value = value.into();
        match column {
            Column::Category => self.category = Some(value),
            Column::Subcategory => self.subcategory = Some(value),
            Column::Department => self.department = Some(value),
            Column::Designer => self.designer = Some(value),
            Column::Size => self.size = Some(value),
            Column::Color => self.color = Some(value),
            Column::Condition => self.condition = Some(value),
            Column::NPhotos => self.n_photos = value.trim().parse().ok(),
        }
        self
    }

    /// Set the numeric column.
    pub fn with_numeric(mut self, column: Column, value: f64) -> Self {
        if column == Column::NPhotos {
            self.n_photos = Some(value);
        }
        self
    }

    /// Set a text field.
    pub fn with_text(mut self, field: TextField, value: impl Into<String>) -> Self {
        *self.text_slot(field) = Some(value.into());
        self
    }

    fn text_slot(&mut self, field: TextField) -> &mut Option<String> {
        match field {
            TextField::ItemName => &mut self.item_name,
            TextField::Description => &mut self.description,
            TextField::Hashtags => &mut self.hashtags,
        }
    }

    fn categorical_slot(&self, column: Column) -> Option<&String> {
        match column {
            Column::Category => self.category.as_ref(),
            Column::Subcategory => self.subcategory.as_ref(),
            Column::Department => self.department.as_ref(),
            Column::Designer => self.designer.as_ref(),
            Column::Size => self.size.as_ref(),
            Column::Color => self.color.as_ref(),
            Column::Condition => self.condition.as_ref(),
            Column::NPhotos => None,
        }
    }

    /// Value of a categorical column.
    ///
    /// # Errors
    /// [`PipelineError::TransformMismatch`] when the value is absent or the
    /// column is numeric.
    pub fn categorical(&self, column: Column) -> Result<&str> {
        if column.is_numeric() {
            return Err(PipelineError::TransformMismatch(format!(
                "column '{}' is numeric, not categorical",
                column
            )));
        }
        self.categorical_slot(column)
            .map(String::as_str)
            .ok_or_else(|| missing_field(column.as_str()))
    }

    /// Value of a numeric column.
    pub fn numeric(&self, column: Column) -> Result<f64> {
        match column {
            Column::NPhotos => self.n_photos.ok_or_else(|| missing_field(column.as_str())),
            other => Err(PipelineError::TransformMismatch(format!(
                "column '{}' is categorical, not numeric",
                other
            ))),
        }
    }

    /// Value of a text field.
    pub fn text(&self, field: TextField) -> Result<&str> {
        let value = match field {
            TextField::ItemName => self.item_name.as_deref(),
            TextField::Description => self.description.as_deref(),
            TextField::Hashtags => self.hashtags.as_deref(),
        };
        value.ok_or_else(|| missing_field(field.as_str()))
    }

    /// Copy of the listing with absent or blank text replaced by [`MISSING_PLACEHOLDER`].
    pub fn clean(&self) -> Listing {
        let mut cleaned = self.clone();
        for field in TextField::ALL {
            let slot = cleaned.text_slot(field);
            let blank = slot.as_deref().map(|t| t.trim().is_empty()).unwrap_or(true);
            if blank {
                *slot = Some(MISSING_PLACEHOLDER.to_string());
            }
        }
        cleaned
    }
}

fn missing_field(name: &str) -> PipelineError {
    PipelineError::TransformMismatch(format!("listing is missing field '{}'", name))
}

/// Listings paired with their sold prices.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub listings: Vec<Listing>,
    pub prices: Vec<f64>,
}

impl Dataset {
    /// Create a dataset, checking that every listing has a positive finite price.
    pub fn new(listings: Vec<Listing>, prices: Vec<f64>) -> Result<Self> {
        if listings.len() != prices.len() {
            return Err(PipelineError::InvalidData(format!(
                "{} listings but {} prices",
                listings.len(),
                prices.len()
            )));
        }
        if let Some((i, p)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(PipelineError::InvalidData(format!(
                "price at row {} must be positive and finite, got {}",
                i, p
            )));
        }
        Ok(Self { listings, prices })
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Subset of rows by index, in the given order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            listings: indices.iter().map(|&i| self.listings[i].clone()).collect(),
            prices: indices.iter().map(|&i| self.prices[i]).collect(),
        }
    }
}
