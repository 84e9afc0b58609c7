//! Structured extraction from discovery and listing pages
//!
//! This module turns parsed HTML into:
//! - Category nodes (navigation menu of the discovery page)
//! - Product records (product tiles of listing and pagination pages)
//! - The results counter text and "load more" URL of a listing page

use crate::catalog::{Category, Product, SubCategory};
use crate::config::SelectorConfig;
use crate::ConfigError;
use scraper::CaseSensitivity::CaseSensitive;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled structural locators
#[derive(Debug, Clone)]
pub struct Selectors {
    category_block: Selector,
    category_name: Selector,
    see_all_class: String,

    product_tile: Selector,
    product_link: Selector,
    product_image: Selector,
    product_image_attr: String,
    product_brand: Selector,
    product_quantity: Selector,
    product_price: Selector,
    product_price_unit: Selector,
    product_price_secondary: Selector,
    product_price_secondary_unit: Selector,

    results_counter: Selector,
    load_more: Selector,
    load_more_attr: String,
}

impl Selectors {
    /// Compiles every locator of the `[selectors]` section
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            category_block: parse_selector("category-block", &config.category_block)?,
            category_name: parse_selector("category-name", &config.category_name)?,
            see_all_class: config.see_all_class.clone(),
            product_tile: parse_selector("product-tile", &config.product_tile)?,
            product_link: parse_selector("product-link", &config.product_link)?,
            product_image: parse_selector("product-image", &config.product_image)?,
            product_image_attr: config.product_image_attr.clone(),
            product_brand: parse_selector("product-brand", &config.product_brand)?,
            product_quantity: parse_selector("product-quantity", &config.product_quantity)?,
            product_price: parse_selector("product-price", &config.product_price)?,
            product_price_unit: parse_selector("product-price-unit", &config.product_price_unit)?,
            product_price_secondary: parse_selector(
                "product-price-secondary",
                &config.product_price_secondary,
            )?,
            product_price_secondary_unit: parse_selector(
                "product-price-secondary-unit",
                &config.product_price_secondary_unit,
            )?,
            results_counter: parse_selector("results-counter", &config.results_counter)?,
            load_more: parse_selector("load-more", &config.load_more)?,
            load_more_attr: config.load_more_attr.clone(),
        })
    }
}

fn parse_selector(name: &str, source: &str) -> Result<Selector, ConfigError> {
    Selector::parse(source).map_err(|e| ConfigError::InvalidSelector {
        name: name.to_string(),
        message: format!("'{}': {:?}", source, e),
    })
}

/// Extracts the category tree from the discovery page
///
/// For each navigation block, the category name is the trimmed text of the
/// first name element. Blocks named `excluded` are skipped. Subcategories
/// come from `ul > li > a` direct children of the block, leaving out the
/// "see all" entry; their hrefs are resolved against `base_url`.
///
/// # Example
///
/// ```
/// use aisle_crawler::config::SelectorConfig;
/// use aisle_crawler::crawler::{extract_categories, Selectors};
/// use scraper::Html;
/// use url::Url;
///
/// let html = Html::parse_document(r#"
///     <div class="container-dropdown-first-column">
///       <div class="dropdown-item">
///         <span class="category-info"> Padaria </span>
///         <ul><li><a href="/padaria/pao/">Pão</a></li></ul>
///       </div>
///     </div>"#);
/// let selectors = Selectors::compile(&SelectorConfig::default()).unwrap();
/// let base = Url::parse("https://shop.pt/").unwrap();
///
/// let categories = extract_categories(&html, &base, &selectors, "Destaques");
/// assert_eq!(categories[0].name, "Padaria");
/// assert_eq!(categories[0].subcategories[0].listing_url(), "https://shop.pt/padaria/pao/");
/// ```
pub fn extract_categories(
    document: &Html,
    base_url: &Url,
    selectors: &Selectors,
    excluded: &str,
) -> Vec<Category> {
    let mut categories = Vec::new();

    for block in document.select(&selectors.category_block) {
        let name = block
            .select(&selectors.category_name)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        if name == excluded {
            tracing::debug!("Skipping excluded category '{}'", name);
            continue;
        }

        let mut category = Category::new(name);

        for link in child_elements(block, "ul")
            .flat_map(|ul| child_elements(ul, "li"))
            .filter(|li| !li.value().has_class(&selectors.see_all_class, CaseSensitive))
            .flat_map(|li| child_elements(li, "a"))
        {
            let href = link.value().attr("href").unwrap_or("").trim();
            let listing_url = match base_url.join(href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(
                        "Skipping subcategory link '{}' in '{}': {}",
                        href,
                        category.name,
                        e
                    );
                    continue;
                }
            };

            category
                .subcategories
                .push(SubCategory::new(element_text(&link), listing_url.as_str()));
        }

        categories.push(category);
    }

    categories
}

/// Extracts every product tile of a listing or pagination page, in document order
pub fn extract_products(document: &Html, selectors: &Selectors) -> Vec<Product> {
    document
        .select(&selectors.product_tile)
        .map(|tile| Product {
            url: child_attr(&tile, &selectors.product_link, "href"),
            name: child_text(&tile, &selectors.product_link),
            image_url: child_attr(&tile, &selectors.product_image, &selectors.product_image_attr),
            brand: child_text(&tile, &selectors.product_brand),
            quantity: child_text(&tile, &selectors.product_quantity),
            price: child_text(&tile, &selectors.product_price),
            price_unit: child_text(&tile, &selectors.product_price_unit),
            price_secondary: child_text(&tile, &selectors.product_price_secondary),
            price_secondary_unit: child_text(&tile, &selectors.product_price_secondary_unit),
        })
        .collect()
}

/// Returns the text of the results counter ("24 of 120 results"), or "" if absent
pub fn extract_results_counter(document: &Html, selectors: &Selectors) -> String {
    child_text(&document.root_element(), &selectors.results_counter)
}

/// Returns the raw "load more" URL attribute, if the page has one
pub fn extract_load_more_url(document: &Html, selectors: &Selectors) -> Option<String> {
    document
        .select(&selectors.load_more)
        .find_map(|el| el.value().attr(&selectors.load_more_attr))
        .map(|s| s.trim().to_string())
}

/// Direct element children of `parent` with the given tag name
fn child_elements<'a>(
    parent: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

/// Trimmed text content of an element
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Concatenated text of every match under `scope`, trimmed
fn child_text(scope: &ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Attribute of the first match under `scope`, or ""
fn child_attr(scope: &ElementRef<'_>, selector: &Selector, attr: &str) -> String {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .unwrap_or("")
        .to_string()
}
