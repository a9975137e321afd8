// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::json;
use vodovoz_app::{
    CatalogResponse, Category, CategoryId, MorePhoto, PriceTier, Product, ProductId,
    STATUS_SUCCESS,
};

const CATEGORY_NAMES: [&str; 6] = [
    "Вода",
    "Кулеры",
    "Помпы",
    "Акции",
    "Чай и кофе",
    "Посуда",
];

const PRODUCT_NAMES: [&str; 14] = [
    "Вода питьевая 19 л",
    "Вода питьевая 6 л",
    "Вода детская 5 л",
    "Вода газированная 1,5 л",
    "Кулер напольный",
    "Кулер настольный",
    "Помпа механическая",
    "Помпа электрическая",
    "Стаканчики 100 шт",
    "Чай черный 100 пак",
    "Кофе зерновой 1 кг",
    "Сахар порционный",
    "Бутыль поликарбонат",
    "Подставка под бутыль",
];

const PICTURE_DIRS: [&str; 4] = [
    "upload/iblock/0a1",
    "upload/iblock/3f9",
    "upload/iblock/7c2",
    "upload/resize_cache/iblock",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible catalog data. Same seed, same catalog.
#[derive(Debug, Clone)]
pub struct CatalogFaker {
    rng: DeterministicRng,
    next_product_id: u64,
}

impl CatalogFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_product_id: 1000,
        }
    }

    pub fn product(&mut self) -> Product {
        self.next_product_id += 1;
        let id = self.next_product_id;
        let name = PRODUCT_NAMES[self.rng.int_n(PRODUCT_NAMES.len())];
        let dir = PICTURE_DIRS[self.rng.int_n(PICTURE_DIRS.len())];
        let base_price = self.int_range(90, 12_000) as f64;

        let extended_price = if self.rng.int_n(5) == 0 {
            None
        } else {
            Some(self.price_tiers(base_price))
        };
        let more_photo = self.rng.bool().then(|| MorePhoto {
            value: (0..self.rng.int_n(3) + 1)
                .map(|index| format!("{dir}/{id}-{index}.jpg"))
                .collect(),
        });

        Product {
            id: ProductId::new(id.to_string()),
            name: (self.rng.int_n(6) != 0).then(|| name.to_owned()),
            detail_picture: format!("{dir}/{id}.png"),
            price: base_price,
            rating: self.int_range(30, 50) as f64 / 10.0,
            catalog_quantity: self.int_range(0, 250),
            extended_price,
            more_photo,
            comment_count: self
                .rng
                .bool()
                .then(|| self.int_range(0, 120).to_string()),
        }
    }

    pub fn category(&mut self, id: i64, product_count: usize) -> Category {
        let name = CATEGORY_NAMES[(id.unsigned_abs() as usize) % CATEGORY_NAMES.len()];
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
            products: (0..product_count).map(|_| self.product()).collect(),
        }
    }

    pub fn catalog(&mut self, category_count: usize) -> CatalogResponse {
        let categories = (0..category_count)
            .map(|index| {
                let product_count = self.rng.int_n(6) + 2;
                self.category(index as i64 + 1, product_count)
            })
            .collect();
        success_response(categories)
    }

    fn price_tiers(&mut self, base_price: f64) -> Vec<PriceTier> {
        let first_break = self.int_range(2, 5);
        let discounted = (base_price * 0.9).round();
        vec![
            PriceTier {
                price: base_price,
                old_price: self.rng.bool().then(|| (base_price * 1.15).round()),
                quantity_from: Some(1),
                quantity_to: Some(first_break - 1),
            },
            PriceTier {
                price: discounted,
                old_price: None,
                quantity_from: Some(first_break),
                quantity_to: None,
            },
        ]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        min + self.rng.int_n((max - min + 1) as usize) as i64
    }
}

pub fn success_response(categories: Vec<Category>) -> CatalogResponse {
    CatalogResponse {
        status: STATUS_SUCCESS.to_owned(),
        message: String::new(),
        categories,
    }
}

/// Product with only the fields the feed always sends.
pub fn bare_product(id: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: None,
        detail_picture: format!("upload/iblock/{id}.png"),
        price: 100.0,
        rating: 5.0,
        catalog_quantity: 1,
        extended_price: None,
        more_photo: None,
        comment_count: None,
    }
}

pub fn named_category(id: i64, name: &str, products: Vec<Product>) -> Category {
    Category {
        id: CategoryId::new(id),
        name: name.to_owned(),
        products,
    }
}

/// Fixed catalog shown by `--demo` and used by UI tests.
pub fn demo_catalog() -> CatalogResponse {
    let mut faker = CatalogFaker::new(2024);
    let categories = ["Вода", "Кулеры", "Акции"]
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let mut category = faker.category(index as i64 + 1, 6);
            category.name = (*name).to_owned();
            category
        })
        .collect();
    success_response(categories)
}

pub fn catalog_json(catalog: &CatalogResponse) -> Result<String> {
    serde_json::to_string(catalog).context("encode catalog fixture")
}

pub fn rejected_json(status: &str, message: &str) -> String {
    json!({ "status": status, "message": message, "TOVARY": [] }).to_string()
}

/// Smallest body the backend can send that still decodes: one category with
/// one product and no optional fields.
pub fn minimal_catalog_json() -> String {
    json!({
        "status": STATUS_SUCCESS,
        "message": "",
        "TOVARY": [
            {
                "ID": 1,
                "NAME": "Вода",
                "data": [
                    {
                        "ID": "1051",
                        "DETAIL_PICTURE": "upload/iblock/1051.png",
                        "PROPERTY_TSENA_ZA_EDINITSU_TOVARA_VALUE": 320.0,
                        "PROPERTY_RATING_VALUE": 4.8,
                        "CATALOG_QUANTITY": 7
                    }
                ]
            }
        ]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::{CatalogFaker, catalog_json, demo_catalog, minimal_catalog_json, rejected_json};
    use anyhow::Result;
    use std::collections::BTreeSet;
    use vodovoz_app::{CatalogResponse, STATUS_SUCCESS};

    #[test]
    fn new_deterministic_seed() {
        let mut left = CatalogFaker::new(42);
        let mut right = CatalogFaker::new(42);
        assert_eq!(left.catalog(3), right.catalog(3));
    }

    #[test]
    fn generated_catalog_satisfies_invariants() {
        for seed in 0_u64..50_u64 {
            let mut faker = CatalogFaker::new(seed);
            let catalog = faker.catalog(4);
            assert_eq!(catalog.validate(), Ok(()), "seed {seed}");
            assert_eq!(catalog.status, STATUS_SUCCESS);
        }
    }

    #[test]
    fn product_ids_are_unique_within_a_faker() {
        let mut faker = CatalogFaker::new(7);
        let catalog = faker.catalog(5);
        let ids = catalog
            .categories
            .iter()
            .flat_map(|category| category.products.iter())
            .map(|product| product.id.clone())
            .collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), catalog.product_count());
    }

    #[test]
    fn demo_catalog_has_three_named_categories() {
        let catalog = demo_catalog();
        let names = catalog
            .categories
            .iter()
            .map(|category| category.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Вода", "Кулеры", "Акции"]);
        assert!(catalog.categories.iter().all(|c| c.products.len() == 6));
    }

    #[test]
    fn json_fixtures_decode() -> Result<()> {
        let catalog = demo_catalog();
        let decoded: CatalogResponse = serde_json::from_str(&catalog_json(&catalog)?)?;
        assert_eq!(decoded, catalog);

        let minimal: CatalogResponse = serde_json::from_str(&minimal_catalog_json())?;
        assert_eq!(minimal.product_count(), 1);

        let rejected: serde_json::Value = serde_json::from_str(&rejected_json("Error", "nope"))?;
        assert_eq!(rejected["status"], "Error");
        Ok(())
    }
}
