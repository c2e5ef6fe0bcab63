use serde::Serialize;

use crate::domain::identifiers::ProductId;

/// Resources requested for every lookup.
pub const DEFAULT_RESOURCES: &[&str] = &[
    "Images.Primary.Small",
    "Images.Primary.Medium",
    "Images.Primary.Large",
    "ItemInfo.Title",
    "ItemInfo.ProductInfo",
    "ItemInfo.Features",
    "ItemInfo.ByLineInfo",
    "Offers.Listings.Condition",
    "Offers.Listings.Price",
    "Offers.Listings.Promotions",
    "BrowseNodeInfo.BrowseNodes",
    "ParentASIN",
];

/// `GetItems` request body.
///
/// Fields are declared in lexicographic key order: serde writes struct fields
/// in declaration order, so [`GetItemsPayload::canonical_bytes`] is the sorted
/// key form that both the signature hash and the request body use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetItemsPayload {
    #[serde(rename = "ItemIdType")]
    item_id_type: &'static str,
    #[serde(rename = "ItemIds")]
    item_ids: Vec<ProductId>,
    #[serde(rename = "LanguagesOfPreference")]
    languages_of_preference: Vec<&'static str>,
    #[serde(rename = "Marketplace")]
    marketplace: String,
    #[serde(rename = "PartnerTag")]
    partner_tag: String,
    #[serde(rename = "PartnerType")]
    partner_type: &'static str,
    #[serde(rename = "Resources")]
    resources: Vec<&'static str>,
}

impl GetItemsPayload {
    /// `ids` are expected already normalized (sorted, unique, non-empty).
    pub fn new(
        ids: &[ProductId],
        marketplace: impl Into<String>,
        partner_tag: impl Into<String>,
    ) -> Self {
        Self {
            item_id_type: "ASIN",
            item_ids: ids.to_vec(),
            languages_of_preference: vec!["en_US"],
            marketplace: marketplace.into(),
            partner_tag: partner_tag.into(),
            partner_type: "Associates",
            resources: DEFAULT_RESOURCES.to_vec(),
        }
    }

    pub fn item_ids(&self) -> &[ProductId] {
        &self.item_ids
    }

    /// Compact JSON with sorted keys.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> GetItemsPayload {
        let ids = vec![ProductId::parse("B08N5WRWNW").expect("valid id")];
        GetItemsPayload::new(&ids, "www.amazon.com", "example-20")
    }

    #[test]
    fn canonical_bytes_match_expected_body() {
        let body = String::from_utf8(payload().canonical_bytes().expect("serialize")).unwrap();
        assert_eq!(
            body,
            concat!(
                r#"{"ItemIdType":"ASIN","ItemIds":["B08N5WRWNW"],"LanguagesOfPreference":["en_US"],"#,
                r#""Marketplace":"www.amazon.com","PartnerTag":"example-20","PartnerType":"Associates","#,
                r#""Resources":["Images.Primary.Small","Images.Primary.Medium","Images.Primary.Large","#,
                r#""ItemInfo.Title","ItemInfo.ProductInfo","ItemInfo.Features","ItemInfo.ByLineInfo","#,
                r#""Offers.Listings.Condition","Offers.Listings.Price","Offers.Listings.Promotions","#,
                r#""BrowseNodeInfo.BrowseNodes","ParentASIN"]}"#
            )
        );
    }

    #[test]
    fn item_ids_keep_normalized_order() {
        let ids = vec![
            ProductId::parse("B07XJ8C8F5").expect("valid id"),
            ProductId::parse("B08N5WRWNW").expect("valid id"),
        ];
        let payload = GetItemsPayload::new(&ids, "www.amazon.com", "example-20");
        assert_eq!(payload.item_ids(), ids.as_slice());
    }

    #[test]
    fn top_level_keys_are_sorted() {
        let value: serde_json::Value =
            serde_json::from_slice(&payload().canonical_bytes().expect("serialize")).unwrap();
        let body = String::from_utf8(payload().canonical_bytes().unwrap()).unwrap();
        let mut keys: Vec<_> = value
            .as_object()
            .expect("object")
            .keys()
            .cloned()
            .collect();
        keys.sort_by_key(|key| body.find(&format!("\"{key}\"")).unwrap_or(usize::MAX));
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
