//! CSV loading of ETL output.
//!
//! The file carries one header row whose names match the listing fields plus
//! `sold_price`. Unknown columns (`id`, `parsing_date`, ...) are ignored.

use super::{Dataset, Listing};
use crate::error::{PipelineError, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRow {
    category: Option<String>,
    subcategory: Option<String>,
    department: Option<String>,
    designer: Option<String>,
    size: Option<String>,
    color: Option<String>,
    condition: Option<String>,
    n_photos: Option<f64>,
    item_name: Option<String>,
    description: Option<String>,
    hashtags: Option<String>,
    sold_price: Option<f64>,
}

impl CsvRow {
    fn into_parts(self) -> (Listing, Option<f64>) {
        let listing = Listing {
            category: self.category,
            subcategory: self.subcategory,
            department: self.department,
            designer: self.designer,
            size: self.size,
            color: self.color,
            condition: self.condition,
            n_photos: self.n_photos,
            item_name: self.item_name,
            description: self.description,
            hashtags: self.hashtags,
        };
        (listing, self.sold_price)
    }
}

/// Load a dataset from a CSV file.
///
/// # Errors
/// [`PipelineError::Io`] if the file cannot be opened,
/// [`PipelineError::InvalidData`] for unparsable rows and missing or
/// non-positive prices.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    let dataset = from_reader(BufReader::new(file))?;
    debug!(path = %path.as_ref().display(), rows = dataset.len(), "loaded listings");
    Ok(dataset)
}

/// Load a dataset from any CSV reader.
///
/// Text fields are cleaned with [`Listing::clean`] on the way in.
pub fn from_reader<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::Fields).from_reader(reader);

    let mut listings = Vec::new();
    let mut prices = Vec::new();
    for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let (listing, price) = result?.into_parts();
        let price = price.ok_or_else(|| {
            PipelineError::InvalidData(format!("row {} has no sold_price", i))
        })?;
        listings.push(listing.clean());
        prices.push(price);
    }

    Dataset::new(listings, prices)
}
