//! Typed view over the upstream `GetItems` response and the import mapping.

use serde::{Deserialize, Serialize};

use super::types::{PostStatus, PostType};

pub const META_ASIN: &str = "spfa_product_asin";
pub const META_LINK: &str = "spfa_product_link";
pub const META_PRICE: &str = "spfa_product_price";
pub const META_SALE_PRICE: &str = "spfa_product_sale_price";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_result: Option<ItemsResult>,
}

impl GetItemsResponse {
    /// Parse an upstream body. Anything that is not JSON of the expected shape yields `None`.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    pub fn items(&self) -> &[ProductItem] {
        self.items_result
            .as_ref()
            .map(|result| result.items.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResult {
    #[serde(default)]
    pub items: Vec<ProductItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductItem {
    #[serde(rename = "ASIN", default)]
    pub asin: String,
    #[serde(rename = "DetailPageURL", default)]
    pub detail_page_url: Option<String>,
    #[serde(default)]
    pub images: Option<Images>,
    #[serde(default)]
    pub item_info: Option<ItemInfo>,
    #[serde(default)]
    pub offers: Option<Offers>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Images {
    #[serde(default)]
    pub primary: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSet {
    #[serde(default)]
    pub small: Option<Image>,
    #[serde(default)]
    pub medium: Option<Image>,
    #[serde(default)]
    pub large: Option<Image>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Image {
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemInfo {
    #[serde(default)]
    pub title: Option<DisplayValue>,
    #[serde(default)]
    pub features: Option<DisplayValues>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisplayValue {
    #[serde(default)]
    pub display_value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisplayValues {
    #[serde(default)]
    pub display_values: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Offers {
    #[serde(default)]
    pub listings: Vec<Listing>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listing {
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Price {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub display_amount: Option<String>,
    #[serde(default)]
    pub savings: Option<Savings>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Savings {
    #[serde(default)]
    pub amount: Option<f64>,
}

impl ProductItem {
    pub fn title(&self) -> &str {
        self.item_info
            .as_ref()
            .and_then(|info| info.title.as_ref())
            .and_then(|title| title.display_value.as_deref())
            .map(str::trim)
            .unwrap_or_default()
    }

    pub fn features(&self) -> &[String] {
        self.item_info
            .as_ref()
            .and_then(|info| info.features.as_ref())
            .map(|features| features.display_values.as_slice())
            .unwrap_or_default()
    }

    pub fn large_image_url(&self) -> Option<&str> {
        self.images
            .as_ref()
            .and_then(|images| images.primary.as_ref())
            .and_then(|primary| primary.large.as_ref())
            .and_then(|image| image.url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    fn first_price(&self) -> Option<&Price> {
        self.offers
            .as_ref()
            .and_then(|offers| offers.listings.first())
            .and_then(|listing| listing.price.as_ref())
    }

    /// Pre-discount price: currency symbol of the display amount followed by
    /// `Amount + Savings.Amount`, trailing zeros trimmed (`$24.99`, `$25`, `$25.5`).
    pub fn list_price(&self) -> String {
        let Some(price) = self.first_price() else {
            return String::new();
        };

        let symbol = price
            .display_amount
            .as_deref()
            .and_then(|display| display.chars().next())
            .map(String::from)
            .unwrap_or_default();

        let savings = price
            .savings
            .as_ref()
            .and_then(|savings| savings.amount)
            .unwrap_or(0.0);
        let cents = to_cents(price.amount.unwrap_or(0.0)) + to_cents(savings);

        format!("{symbol}{}", format_cents(cents))
    }

    /// Price as shown upstream, e.g. `$19.99 ($2.00 / count)`.
    pub fn sale_price(&self) -> String {
        self.first_price()
            .and_then(|price| price.display_amount.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }

    /// Map this item into the record plus meta entries created on import.
    pub fn to_draft(&self, status: PostStatus, post_type: PostType) -> ProductRecordDraft {
        ProductRecordDraft {
            asin: self.asin.clone(),
            title: self.title().to_string(),
            content: self
                .features()
                .iter()
                .map(|feature| feature.trim())
                .collect::<Vec<_>>()
                .join("\n"),
            status,
            post_type,
            link: self
                .detail_page_url
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            price: self.list_price(),
            sale_price: self.sale_price(),
            image_url: self.large_image_url().map(str::to_string),
        }
    }
}

/// Everything needed to persist one imported product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecordDraft {
    pub asin: String,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub post_type: PostType,
    pub link: String,
    pub price: String,
    pub sale_price: String,
    pub image_url: Option<String>,
}

impl ProductRecordDraft {
    /// Meta entries in the order they are attached.
    pub fn meta(&self) -> [(&'static str, &str); 4] {
        [
            (META_ASIN, self.asin.as_str()),
            (META_LINK, self.link.as_str()),
            (META_PRICE, self.price.as_str()),
            (META_SALE_PRICE, self.sale_price.as_str()),
        ]
    }
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let whole = cents / 100;
    let fraction = cents % 100;

    if fraction == 0 {
        format!("{sign}{whole}")
    } else if fraction % 10 == 0 {
        format!("{sign}{whole}.{}", fraction / 10)
    } else {
        format!("{sign}{whole}.{fraction:02}")
    }
}
