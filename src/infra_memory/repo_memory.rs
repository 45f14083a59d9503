use crate::application_port::{AuthError, DomainError};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Transaction seam for the in-memory backend. Writes land immediately;
/// commit and rollback are accepted and ignored. Good enough for the demo
/// backend and for tests, which never rely on mid-batch rollback.
pub struct NoopTxManager;

#[async_trait::async_trait]
impl TxManager for NoopTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        Ok(Box::new(NoopTx))
    }
}

pub struct NoopTx;

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for NoopTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

// region users

pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
    by_name: DashMap<String, UserId>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        MemoryUserRepo {
            users: DashMap::new(),
            by_name: DashMap::new(),
        }
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
    ) -> Result<(), AuthError> {
        if self.by_name.contains_key(username) {
            return Err(AuthError::UserExists);
        }
        self.by_name.insert(username.to_string(), user_id);
        self.users.insert(
            user_id,
            UserRecord {
                user_id,
                username: username.to_string(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.by_name.contains_key(username))
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, AuthError> {
        Ok(self
            .users
            .get(&user_id)
            .map(|u| u.is_active)
            .unwrap_or(false))
    }
}

pub struct MemoryAuthRepo {
    creds: DashMap<String, AuthRecord>,
}

impl MemoryAuthRepo {
    pub fn new() -> Self {
        MemoryAuthRepo {
            creds: DashMap::new(),
        }
    }
}

impl Default for MemoryAuthRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuthRepo for MemoryAuthRepo {
    async fn create_credentials_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        self.creds.insert(
            username.to_string(),
            AuthRecord {
                user_id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                is_active: true,
            },
        );
        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<AuthRecord>, AuthError> {
        Ok(self.creds.get(username).map(|r| r.value().clone()))
    }
}

// endregion

// region catalog

pub struct MemoryCatalogRepo {
    products: DashMap<ProductId, ProductRecord>,
}

impl MemoryCatalogRepo {
    pub fn new() -> Self {
        MemoryCatalogRepo {
            products: DashMap::new(),
        }
    }

    pub fn insert(&self, product: ProductRecord) {
        self.products.insert(product.product_id, product);
    }
}

impl Default for MemoryCatalogRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CatalogRepo for MemoryCatalogRepo {
    async fn find(&self, product: ProductId) -> Result<Option<ProductRecord>, DomainError> {
        Ok(self.products.get(&product).map(|p| p.value().clone()))
    }

    async fn product_exists(&self, product: ProductId) -> Result<bool, DomainError> {
        Ok(self
            .products
            .get(&product)
            .map(|p| p.is_active)
            .unwrap_or(false))
    }
}

// endregion

// region cart

#[derive(Clone)]
struct CartLine {
    quantity: u32,
    added_at: DateTime<Utc>,
}

pub struct MemoryCartRepo {
    lines: DashMap<UserId, BTreeMap<ProductId, CartLine>>,
    catalog: Arc<dyn CatalogRepo>,
}

impl MemoryCartRepo {
    pub fn new(catalog: Arc<dyn CatalogRepo>) -> Self {
        MemoryCartRepo {
            lines: DashMap::new(),
            catalog,
        }
    }
}

#[async_trait::async_trait]
impl CartRepo for MemoryCartRepo {
    async fn list_with_details(&self, user: UserId) -> Result<Vec<CartEntry>, DomainError> {
        let snapshot: Vec<(ProductId, CartLine)> = match self.lines.get(&user) {
            Some(lines) => lines.iter().map(|(p, l)| (*p, l.clone())).collect(),
            None => return Ok(Vec::new()),
        };

        let mut entries = Vec::with_capacity(snapshot.len());
        for (product_id, line) in snapshot {
            if let Some(product) = self.catalog.find(product_id).await? {
                entries.push(CartEntry {
                    product_id,
                    title: product.title,
                    unit_price_cents: product.unit_price_cents,
                    quantity: line.quantity,
                    added_at: line.added_at,
                });
            }
        }
        Ok(entries)
    }

    async fn count(&self, user: UserId) -> Result<u64, DomainError> {
        Ok(self.lines.get(&user).map(|l| l.len() as u64).unwrap_or(0))
    }

    async fn add_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<bool, DomainError> {
        let mut lines = self.lines.entry(user).or_default();
        if lines.contains_key(&product) {
            return Ok(false);
        }
        lines.insert(
            product,
            CartLine {
                quantity,
                added_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn set_quantity_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<bool, DomainError> {
        let mut lines = self.lines.entry(user).or_default();
        match lines.get_mut(&product) {
            Some(line) => {
                line.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError> {
        let mut lines = self.lines.entry(user).or_default();
        Ok(lines.remove(&product).is_some())
    }
}

// endregion

// region favorites

pub struct MemoryFavoritesRepo {
    favorites: DashMap<UserId, BTreeMap<ProductId, DateTime<Utc>>>,
    catalog: Arc<dyn CatalogRepo>,
}

impl MemoryFavoritesRepo {
    pub fn new(catalog: Arc<dyn CatalogRepo>) -> Self {
        MemoryFavoritesRepo {
            favorites: DashMap::new(),
            catalog,
        }
    }
}

#[async_trait::async_trait]
impl FavoritesRepo for MemoryFavoritesRepo {
    async fn list_with_details(&self, user: UserId) -> Result<Vec<FavoriteEntry>, DomainError> {
        let snapshot: Vec<(ProductId, DateTime<Utc>)> = match self.favorites.get(&user) {
            Some(favs) => favs.iter().map(|(p, at)| (*p, *at)).collect(),
            None => return Ok(Vec::new()),
        };

        let mut entries = Vec::with_capacity(snapshot.len());
        for (product_id, added_at) in snapshot {
            if let Some(product) = self.catalog.find(product_id).await? {
                entries.push(FavoriteEntry {
                    product_id,
                    title: product.title,
                    unit_price_cents: product.unit_price_cents,
                    added_at,
                });
            }
        }
        Ok(entries)
    }

    async fn count(&self, user: UserId) -> Result<u64, DomainError> {
        Ok(self
            .favorites
            .get(&user)
            .map(|f| f.len() as u64)
            .unwrap_or(0))
    }

    async fn add_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError> {
        let mut favs = self.favorites.entry(user).or_default();
        if favs.contains_key(&product) {
            return Ok(false);
        }
        favs.insert(product, Utc::now());
        Ok(true)
    }

    async fn remove_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError> {
        let mut favs = self.favorites.entry(user).or_default();
        Ok(favs.remove(&product).is_some())
    }
}

// endregion

// region profile

pub struct MemoryProfileRepo {
    fields: DashMap<UserId, BTreeMap<ProfileFieldKey, ProfileField>>,
}

impl MemoryProfileRepo {
    pub fn new() -> Self {
        MemoryProfileRepo {
            fields: DashMap::new(),
        }
    }
}

impl Default for MemoryProfileRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProfileRepo for MemoryProfileRepo {
    async fn list_fields(&self, user: UserId) -> Result<Vec<ProfileField>, DomainError> {
        Ok(self
            .fields
            .get(&user)
            .map(|f| f.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_field_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        key: ProfileFieldKey,
        value: &str,
    ) -> Result<(), DomainError> {
        self.fields.entry(user).or_default().insert(
            key,
            ProfileField {
                key,
                value: value.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn unset_field_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        key: ProfileFieldKey,
    ) -> Result<bool, DomainError> {
        let mut fields = self.fields.entry(user).or_default();
        Ok(fields.remove(&key).is_some())
    }
}

// endregion

// region promocodes

pub struct MemoryPromocodeRepo {
    codes: DashMap<PromocodeCode, Promocode>,
    applied: DashMap<UserId, BTreeMap<PromocodeCode, AppliedPromocode>>,
}

impl MemoryPromocodeRepo {
    pub fn new() -> Self {
        MemoryPromocodeRepo {
            codes: DashMap::new(),
            applied: DashMap::new(),
        }
    }
}

impl Default for MemoryPromocodeRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PromocodeRepo for MemoryPromocodeRepo {
    async fn find_code(&self, code: &PromocodeCode) -> Result<Option<Promocode>, DomainError> {
        Ok(self.codes.get(code).map(|c| c.value().clone()))
    }

    async fn list_codes(&self) -> Result<Vec<Promocode>, DomainError> {
        let mut codes: Vec<Promocode> = self.codes.iter().map(|c| c.value().clone()).collect();
        codes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(codes)
    }

    async fn insert_code_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        code: &Promocode,
    ) -> Result<bool, DomainError> {
        if self.codes.contains_key(&code.code) {
            return Ok(false);
        }
        self.codes.insert(code.code.clone(), code.clone());
        Ok(true)
    }

    async fn retire_code_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        code: &PromocodeCode,
    ) -> Result<bool, DomainError> {
        match self.codes.get_mut(code) {
            Some(mut promocode) if promocode.is_active => {
                promocode.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_applied(&self, user: UserId) -> Result<Vec<AppliedPromocode>, DomainError> {
        Ok(self
            .applied
            .get(&user)
            .map(|a| a.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn apply_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        applied: &AppliedPromocode,
    ) -> Result<bool, DomainError> {
        let mut codes = self.applied.entry(user).or_default();
        if codes.contains_key(&applied.code) {
            return Ok(false);
        }
        codes.insert(applied.code.clone(), applied.clone());
        Ok(true)
    }

    async fn release_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user: UserId,
        code: &PromocodeCode,
    ) -> Result<bool, DomainError> {
        let mut codes = self.applied.entry(user).or_default();
        Ok(codes.remove(code).is_some())
    }
}

// endregion
