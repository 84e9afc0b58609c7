//! CSV export of the collected tree
//!
//! The tree is flattened depth-first (Category → SubCategory → Product), one
//! row per product, each row repeating its owning category and subcategory.

use crate::catalog::Category;
use crate::CrawlError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column names, in output order
pub const CSV_HEADER: [&str; 12] = [
    "category_name",
    "sub_category_name",
    "sub_category_url",
    "product_name",
    "product_url",
    "product_img_url",
    "product_brand",
    "product_quantity",
    "product_price",
    "product_price_unit",
    "product_price_secondary",
    "product_price_secondary_unit",
];

/// One exported line
#[derive(Debug, Serialize)]
struct ProductRow<'a> {
    category_name: &'a str,
    sub_category_name: &'a str,
    sub_category_url: &'a str,
    product_name: &'a str,
    product_url: &'a str,
    product_img_url: &'a str,
    product_brand: &'a str,
    product_quantity: &'a str,
    product_price: &'a str,
    product_price_unit: &'a str,
    product_price_secondary: &'a str,
    product_price_secondary_unit: &'a str,
}

/// Flattens the tree into rows, depth-first
fn rows(categories: &[Category]) -> impl Iterator<Item = ProductRow<'_>> {
    categories.iter().flat_map(|category| {
        category.subcategories.iter().flat_map(move |sub| {
            sub.products().iter().map(move |p| ProductRow {
                category_name: &category.name,
                sub_category_name: &sub.name,
                sub_category_url: sub.listing_url(),
                product_name: &p.name,
                product_url: &p.url,
                product_img_url: &p.image_url,
                product_brand: &p.brand,
                product_quantity: &p.quantity,
                product_price: &p.price,
                product_price_unit: &p.price_unit,
                product_price_secondary: &p.price_secondary,
                product_price_secondary_unit: &p.price_secondary_unit,
            })
        })
    })
}

/// What an export produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows_written: usize,
    pub rows_failed: usize,
}

/// Encodes one record as a complete CSV line
fn encode_line(
    write: impl FnOnce(&mut csv::Writer<&mut Vec<u8>>) -> csv::Result<()>,
) -> csv::Result<Vec<u8>> {
    let mut line = Vec::new();
    {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut line);
        write(&mut csv_writer)?;
        csv_writer.flush()?;
    }
    Ok(line)
}

/// Writes the header and one row per product to `writer`
///
/// Each row is encoded and handed to `writer` on its own, so a row that
/// fails to serialize or write is logged and skipped while later rows still
/// go out. Failing to write the header or to flush is returned as an error.
pub fn write_csv<W: Write>(
    categories: &[Category],
    mut writer: W,
) -> Result<ExportSummary, CrawlError> {
    let header = encode_line(|w| w.write_record(CSV_HEADER))?;
    writer.write_all(&header)?;

    let mut summary = ExportSummary::default();
    for row in rows(categories) {
        let written = encode_line(|w| w.serialize(&row))
            .and_then(|line| writer.write_all(&line).map_err(csv::Error::from));

        match written {
            Ok(()) => summary.rows_written += 1,
            Err(e) => {
                tracing::warn!(
                    "Couldn't write row for product '{}' in '{}': {}",
                    row.product_name,
                    row.sub_category_name,
                    e
                );
                summary.rows_failed += 1;
            }
        }
    }

    writer.flush()?;
    Ok(summary)
}

/// Creates (or truncates) `path` and exports the tree into it
///
/// # Example
///
/// ```no_run
/// use aisle_crawler::catalog::Category;
/// use aisle_crawler::output::export_csv;
/// use std::path::Path;
///
/// let summary = export_csv(&[Category::new("Padaria")], Path::new("data.csv")).unwrap();
/// assert_eq!(summary.rows_written, 0);
/// ```
pub fn export_csv(categories: &[Category], path: &Path) -> Result<ExportSummary, CrawlError> {
    let file = File::create(path)?;
    let summary = write_csv(categories, BufWriter::new(file))?;

    tracing::info!(
        "Wrote {} rows to {}",
        summary.rows_written,
        path.display()
    );

    Ok(summary)
}
