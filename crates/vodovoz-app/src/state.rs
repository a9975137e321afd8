// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::{CatalogSelectionState, Category, IndexError, Product, ProductId, TabKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenState {
    pub active_tab: TabKind,
    pub catalog: CatalogSelectionState,
    pub product_cursor: usize,
    pub favorites: BTreeSet<ProductId>,
    pub status_line: Option<String>,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            active_tab: TabKind::Home,
            catalog: CatalogSelectionState::new(),
            product_cursor: 0,
            favorites: BTreeSet::new(),
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenCommand {
    NextTab,
    PrevTab,
    SelectTab(TabKind),
    LoadCatalog(Vec<Category>),
    SelectCategory(usize),
    NextCategory,
    PrevCategory,
    NextProduct,
    PrevProduct,
    ToggleFavorite,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    TabChanged(TabKind),
    CatalogLoaded { categories: usize, products: usize },
    CategorySelected { index: usize, products: usize },
    SelectionRejected(IndexError),
    ProductFocused(usize),
    FavoriteToggled { product: ProductId, favorite: bool },
    StatusUpdated(String),
    StatusCleared,
}

impl ScreenState {
    pub fn dispatch(&mut self, command: ScreenCommand) -> Vec<ScreenEvent> {
        match command {
            ScreenCommand::NextTab => self.rotate_tab(1),
            ScreenCommand::PrevTab => self.rotate_tab(-1),
            ScreenCommand::SelectTab(tab) => {
                if self.active_tab == tab {
                    return Vec::new();
                }
                self.active_tab = tab;
                vec![ScreenEvent::TabChanged(tab)]
            }
            ScreenCommand::LoadCatalog(categories) => self.load_catalog(categories),
            ScreenCommand::SelectCategory(index) => self.select_category(index),
            ScreenCommand::NextCategory => self.rotate_category(1),
            ScreenCommand::PrevCategory => self.rotate_category(-1),
            ScreenCommand::NextProduct => self.move_product_cursor(1),
            ScreenCommand::PrevProduct => self.move_product_cursor(-1),
            ScreenCommand::ToggleFavorite => self.toggle_favorite(),
            ScreenCommand::SetStatus(message) => vec![self.set_status(message)],
            ScreenCommand::ClearStatus => {
                self.status_line = None;
                vec![ScreenEvent::StatusCleared]
            }
        }
    }

    pub fn focused_product(&self) -> Option<&Product> {
        self.catalog.current_products().get(self.product_cursor)
    }

    pub fn is_favorite(&self, product: &ProductId) -> bool {
        self.favorites.contains(product)
    }

    /// Favorited products still present in the loaded catalog, in catalog
    /// order. A product listed under several categories appears once.
    pub fn favorite_products(&self) -> Vec<&Product> {
        let mut seen = BTreeSet::new();
        self.catalog
            .categories()
            .iter()
            .flat_map(|category| category.products.iter())
            .filter(|product| self.favorites.contains(&product.id))
            .filter(|product| seen.insert(product.id.clone()))
            .collect()
    }

    fn load_catalog(&mut self, categories: Vec<Category>) -> Vec<ScreenEvent> {
        let category_count = categories.len();
        let product_count = categories
            .iter()
            .map(|category| category.products.len())
            .sum();
        self.catalog.load(categories);
        self.product_cursor = 0;

        let mut events = vec![ScreenEvent::CatalogLoaded {
            categories: category_count,
            products: product_count,
        }];
        if let Some(index) = self.catalog.selected_index() {
            events.push(ScreenEvent::CategorySelected {
                index,
                products: self.catalog.current_products().len(),
            });
        }
        events
    }

    fn select_category(&mut self, index: usize) -> Vec<ScreenEvent> {
        match self.catalog.select(index) {
            Ok(products) => {
                let products = products.len();
                self.product_cursor = 0;
                vec![ScreenEvent::CategorySelected { index, products }]
            }
            Err(error) => vec![ScreenEvent::SelectionRejected(error)],
        }
    }

    fn rotate_category(&mut self, delta: isize) -> Vec<ScreenEvent> {
        let len = self.catalog.categories().len() as isize;
        let Some(current) = self.catalog.selected_index() else {
            return Vec::new();
        };
        let next = (current as isize + delta).rem_euclid(len) as usize;
        if next == current {
            return Vec::new();
        }
        self.select_category(next)
    }

    fn move_product_cursor(&mut self, delta: isize) -> Vec<ScreenEvent> {
        let len = self.catalog.current_products().len();
        if len == 0 {
            return Vec::new();
        }
        let next = (self.product_cursor as isize + delta).clamp(0, len as isize - 1) as usize;
        if next == self.product_cursor {
            return Vec::new();
        }
        self.product_cursor = next;
        vec![ScreenEvent::ProductFocused(next)]
    }

    fn toggle_favorite(&mut self) -> Vec<ScreenEvent> {
        let Some(product) = self.focused_product().map(|product| product.id.clone()) else {
            return Vec::new();
        };
        let favorite = if self.favorites.remove(&product) {
            false
        } else {
            self.favorites.insert(product.clone());
            true
        };
        vec![ScreenEvent::FavoriteToggled { product, favorite }]
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<ScreenEvent> {
        let tabs = TabKind::ALL;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_tab = tabs[next];
        vec![ScreenEvent::TabChanged(self.active_tab)]
    }

    fn set_status(&mut self, message: String) -> ScreenEvent {
        self.status_line = Some(message.clone());
        ScreenEvent::StatusUpdated(message)
    }
}
