// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use url::Url;

use crate::ids::*;

/// Envelope status the backend sends for a usable catalog.
pub const STATUS_SUCCESS: &str = "Success";
pub const CURRENCY_SUFFIX: &str = "₽";
pub const NO_PRICE_LABEL: &str = "Нет данных";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    #[serde(rename = "PRICE")]
    pub price: f64,
    #[serde(rename = "OLD_PRICE", default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    #[serde(
        rename = "QUANTITY_FROM",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity_from: Option<i64>,
    #[serde(rename = "QUANTITY_TO", default, skip_serializing_if = "Option::is_none")]
    pub quantity_to: Option<i64>,
}

impl PriceTier {
    /// Quantity range the tier price applies to. Missing bounds are open.
    pub fn range_label(&self) -> String {
        match (self.quantity_from, self.quantity_to) {
            (Some(from), Some(to)) if from == to => format!("{from}"),
            (Some(from), Some(to)) => format!("{from}-{to}"),
            (Some(from), None) => format!("{from}+"),
            (None, Some(to)) => format!("<={to}"),
            (None, None) => "any".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorePhoto {
    #[serde(rename = "VALUE")]
    pub value: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "ID")]
    pub id: ProductId,
    #[serde(rename = "NAME", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "DETAIL_PICTURE")]
    pub detail_picture: String,
    #[serde(rename = "PROPERTY_TSENA_ZA_EDINITSU_TOVARA_VALUE")]
    pub price: f64,
    #[serde(rename = "PROPERTY_RATING_VALUE")]
    pub rating: f64,
    #[serde(rename = "CATALOG_QUANTITY")]
    pub catalog_quantity: i64,
    #[serde(
        rename = "EXTENDED_PRICE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extended_price: Option<Vec<PriceTier>>,
    #[serde(rename = "MORE_PHOTO", default, skip_serializing_if = "Option::is_none")]
    pub more_photo: Option<MorePhoto>,
    /// Opaque; the feed sends a string and nothing downstream interprets it.
    #[serde(
        rename = "COUTCOMMENTS",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub comment_count: Option<String>,
}

impl Product {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn price_tiers(&self) -> &[PriceTier] {
        self.extended_price.as_deref().unwrap_or_default()
    }

    pub fn extra_photos(&self) -> &[String] {
        self.more_photo
            .as_ref()
            .map(|photos| photos.value.as_slice())
            .unwrap_or_default()
    }

    /// Label shown on a product card: the first tier price rounded to whole
    /// units, or a placeholder when the product has no tiers.
    pub fn price_label(&self) -> String {
        match self.price_tiers().first() {
            Some(tier) => format!("{} {CURRENCY_SUFFIX}", tier.price.round() as i64),
            None => NO_PRICE_LABEL.to_owned(),
        }
    }


    pub fn image_url(&self, base_url: &str) -> Option<Url> {
        if self.detail_picture.trim().is_empty() {
            return None;
        }
        Url::parse(&format!("{base_url}{}", self.detail_picture)).ok()
    }

    pub fn in_stock(&self) -> bool {
        self.catalog_quantity > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "ID")]
    pub id: CategoryId,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "data")]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "TOVARY")]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogViolation {
    #[error("category {category}: product at position {position} has an empty ID")]
    EmptyProductId {
        category: CategoryId,
        position: usize,
    },
    #[error("category {category}: product {product} has negative price {price}")]
    NegativePrice {
        category: CategoryId,
        product: ProductId,
        price: f64,
    },
    #[error("category {category}: product {product} tier {tier} has negative price {price}")]
    NegativeTierPrice {
        category: CategoryId,
        product: ProductId,
        tier: usize,
        price: f64,
    },
    #[error(
        "category {category}: product {product} tier {tier} has quantity range {from}..={to} with from > to"
    )]
    InvertedTierRange {
        category: CategoryId,
        product: ProductId,
        tier: usize,
        from: i64,
        to: i64,
    },
    #[error("category ID {category} appears more than once")]
    DuplicateCategoryId { category: CategoryId },
}

impl CatalogResponse {
    pub fn product_count(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.products.len())
            .sum()
    }

    /// Checks the invariants serde cannot express. Stops at the first
    /// violation in server order.
    pub fn validate(&self) -> Result<(), CatalogViolation> {
        let mut seen = BTreeSet::new();
        for category in &self.categories {
            if !seen.insert(category.id) {
                return Err(CatalogViolation::DuplicateCategoryId {
                    category: category.id,
                });
            }
            for (position, product) in category.products.iter().enumerate() {
                validate_product(category.id, position, product)?;
            }
        }
        Ok(())
    }
}

fn validate_product(
    category: CategoryId,
    position: usize,
    product: &Product,
) -> Result<(), CatalogViolation> {
    if product.id.is_empty() {
        return Err(CatalogViolation::EmptyProductId { category, position });
    }
    if product.price < 0.0 {
        return Err(CatalogViolation::NegativePrice {
            category,
            product: product.id.clone(),
            price: product.price,
        });
    }
    for (tier_index, tier) in product.price_tiers().iter().enumerate() {
        if tier.price < 0.0 {
            return Err(CatalogViolation::NegativeTierPrice {
                category,
                product: product.id.clone(),
                tier: tier_index,
                price: tier.price,
            });
        }
        if let (Some(from), Some(to)) = (tier.quantity_from, tier.quantity_to)
            && from > to
        {
            return Err(CatalogViolation::InvertedTierRange {
                category,
                product: product.id.clone(),
                tier: tier_index,
                from,
                to,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Home,
    Catalog,
    Cart,
    Favorites,
    Profile,
}

impl TabKind {
    pub const ALL: [Self; 5] = [
        Self::Home,
        Self::Catalog,
        Self::Cart,
        Self::Favorites,
        Self::Profile,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "Главная",
            Self::Catalog => "Каталог",
            Self::Cart => "Корзина",
            Self::Favorites => "Избранное",
            Self::Profile => "Профиль",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Catalog => "catalog",
            Self::Cart => "cart",
            Self::Favorites => "favorites",
            Self::Profile => "profile",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "home" => Some(Self::Home),
            "catalog" => Some(Self::Catalog),
            "cart" => Some(Self::Cart),
            "favorites" => Some(Self::Favorites),
            "profile" => Some(Self::Profile),
            _ => None,
        }
    }
}
