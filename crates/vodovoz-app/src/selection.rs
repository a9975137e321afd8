// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{Category, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("category index {index} is out of range for {len} loaded categories")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

/// Last-loaded categories plus the selected one.
///
/// `selected` is `None` exactly when `categories` is empty; otherwise it is
/// always a valid index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogSelectionState {
    categories: Vec<Category>,
    selected: Option<usize>,
}

impl CatalogSelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the catalog wholesale. Selection resets to the first
    /// category, or to nothing for an empty catalog.
    pub fn load(&mut self, categories: Vec<Category>) {
        self.selected = if categories.is_empty() { None } else { Some(0) };
        self.categories = categories;
    }

    pub fn select(&mut self, index: usize) -> Result<&[Product], IndexError> {
        let len = self.categories.len();
        if index >= len {
            return Err(IndexError { index, len });
        }
        self.selected = Some(index);
        Ok(&self.categories[index].products)
    }

    pub fn current_products(&self) -> &[Product] {
        self.selected_category()
            .map(|category| category.products.as_slice())
            .unwrap_or_default()
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories
            .iter()
            .map(|category| category.name.as_str())
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.selected.and_then(|index| self.categories.get(index))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
