// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::io::Write;
use vodovoz_app::{CURRENCY_SUFFIX, CatalogResponse, Product};

/// Plain-text listing of one fetched catalog. Each product gets one line,
/// plus an indented tier line when the feed sends quantity pricing.
pub fn write_catalog(
    out: &mut impl Write,
    catalog: &CatalogResponse,
    image_base_url: &str,
) -> Result<()> {
    writeln!(
        out,
        "{} categories, {} products",
        catalog.categories.len(),
        catalog.product_count()
    )
    .context("write catalog summary")?;

    for (index, category) in catalog.categories.iter().enumerate() {
        writeln!(
            out,
            "\n[{}] {} (id {}, {} products)",
            index + 1,
            category.name,
            category.id,
            category.products.len()
        )
        .context("write category header")?;

        for product in &category.products {
            let stock = if product.in_stock() {
                format!("{} in stock", product.catalog_quantity)
            } else {
                "out of stock".to_owned()
            };
            let mut image = product
                .image_url(image_base_url)
                .map_or_else(|| "-".to_owned(), String::from);
            let extra = product.extra_photos().len();
            if extra > 0 {
                image.push_str(&format!(" (+{extra} photos)"));
            }
            writeln!(
                out,
                "  {:<8} {:<32} {:>10}  ★{:.1}  {stock}  {image}",
                product.id.as_str(),
                product.display_name(),
                product.price_label(),
                product.rating,
            )
            .context("write product line")?;

            if let Some(tiers) = tier_line(product) {
                writeln!(out, "           tiers: {tiers}").context("write tier line")?;
            }
        }
    }
    Ok(())
}

fn tier_line(product: &Product) -> Option<String> {
    let tiers = product.price_tiers();
    if tiers.is_empty() {
        return None;
    }
    let parts = tiers
        .iter()
        .map(|tier| {
            format!(
                "{} {} {CURRENCY_SUFFIX}",
                tier.range_label(),
                tier.price.round() as i64
            )
        })
        .collect::<Vec<_>>();
    Some(parts.join(" | "))
}
