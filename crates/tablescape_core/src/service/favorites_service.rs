//! Favorite-product store.
//!
//! # Responsibility
//! - Keep the favorites id-set in memory and persist every mutation whole.
//!
//! # Invariants
//! - Readers get immutable views; mutation goes through `toggle`/`clear`.
//! - Persistence failure leaves the in-memory set unchanged.

use crate::model::product::{Product, ProductId};
use crate::repo::favorites_repo::FavoritesRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::catalog_service::ProductCatalog;
use log::info;
use std::collections::BTreeSet;

/// Persisted favorites store.
pub struct FavoritesStore<R: FavoritesRepository> {
    repo: R,
    favorites: BTreeSet<ProductId>,
}

impl<R: FavoritesRepository> FavoritesStore<R> {
    /// Opens the store and loads the persisted set.
    pub fn open(repo: R) -> RepoResult<Self> {
        let favorites = repo.read_favorites()?;
        Ok(Self { repo, favorites })
    }

    /// Toggles one product; returns whether it is a favorite afterwards.
    pub fn toggle(&mut self, product_id: ProductId) -> Result<bool, RepoError> {
        let mut updated = self.favorites.clone();
        let now_favorite = if updated.contains(&product_id) {
            updated.remove(&product_id);
            false
        } else {
            updated.insert(product_id);
            true
        };

        self.repo.write_favorites(&updated)?;
        self.favorites = updated;

        info!(
            "event=favorite_toggle module=favorites status=ok product_id={product_id} favorite={now_favorite}"
        );
        Ok(now_favorite)
    }

    pub fn is_favorite(&self, product_id: ProductId) -> bool {
        self.favorites.contains(&product_id)
    }

    /// Immutable view of the favorite id-set.
    pub fn favorite_ids(&self) -> &BTreeSet<ProductId> {
        &self.favorites
    }

    /// Favorite products resolved against the catalog, in catalog order.
    /// Ids missing from the catalog are simply not listed.
    pub fn favorite_products<'a>(&self, catalog: &'a ProductCatalog) -> Vec<&'a Product> {
        catalog
            .products()
            .iter()
            .filter(|product| self.favorites.contains(&product.id))
            .collect()
    }

    /// Removes every favorite.
    pub fn clear(&mut self) -> Result<(), RepoError> {
        let empty = BTreeSet::new();
        self.repo.write_favorites(&empty)?;
        self.favorites = empty;
        Ok(())
    }
}
