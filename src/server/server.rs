use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::{ProductId, ProductRecord};
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::settings::Settings;
use nanoid::nanoid;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub cart_service: Arc<dyn CartService>,
    pub favorites_service: Arc<dyn FavoritesService>,
    pub profile_service: Arc<dyn ProfileService>,
    pub promocode_service: Arc<dyn PromocodeService>,
}

/// One set of leaf adapters, chosen by `store.backend`.
struct Backend {
    user_repo: Arc<dyn UserRepo>,
    auth_repo: Arc<dyn AuthRepo>,
    catalog_repo: Arc<dyn CatalogRepo>,
    cart_repo: Arc<dyn CartRepo>,
    favorites_repo: Arc<dyn FavoritesRepo>,
    profile_repo: Arc<dyn ProfileRepo>,
    promocode_repo: Arc<dyn PromocodeRepo>,
    session_store: Arc<dyn AuthSessionStore>,
    tx_manager: Arc<dyn TxManager>,
}

fn memory_backend() -> Backend {
    let catalog = Arc::new(MemoryCatalogRepo::new());
    seed_demo_catalog(&catalog);

    Backend {
        user_repo: Arc::new(MemoryUserRepo::new()),
        auth_repo: Arc::new(MemoryAuthRepo::new()),
        cart_repo: Arc::new(MemoryCartRepo::new(catalog.clone())),
        favorites_repo: Arc::new(MemoryFavoritesRepo::new(catalog.clone())),
        catalog_repo: catalog,
        profile_repo: Arc::new(MemoryProfileRepo::new()),
        promocode_repo: Arc::new(MemoryPromocodeRepo::new()),
        session_store: Arc::new(MemoryAuthSessionStore::new()),
        tx_manager: Arc::new(NoopTxManager),
    }
}

/// A handful of stable products so the demo backend is usable without a
/// catalog import.
fn seed_demo_catalog(catalog: &MemoryCatalogRepo) {
    let demo = [
        ("demo-product-headphones", "Wireless headphones", 19900_u64),
        ("demo-product-mug", "Ceramic mug", 1450),
        ("demo-product-notebook", "Dotted notebook", 890),
    ];
    for (seed, title, unit_price_cents) in demo {
        catalog.insert(ProductRecord {
            product_id: ProductId(Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())),
            title: title.to_string(),
            unit_price_cents,
            is_active: true,
        });
    }
}

async fn mysql_backend(settings: &Settings) -> anyhow::Result<Backend> {
    let pool = Pool::<MySql>::connect(&settings.store.mysql_dsn).await?;
    let tx_manager: Arc<dyn TxManager> = Arc::new(MySqlTxManager::new(pool.clone()));

    let redis_client = redis::Client::open(settings.store.redis_dsn.as_str())?;
    let redis_manager = redis_client.get_connection_manager().await?;
    let alphabet: [char; 16] = [
        '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
    ];
    let run_id = nanoid!(10, &alphabet);
    let session_store: Arc<dyn AuthSessionStore> = Arc::new(RedisAuthSessionStore::new(
        redis_manager,
        format!("auth:{}", run_id),
    ));

    Ok(Backend {
        user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
        auth_repo: Arc::new(MySqlAuthRepo::new(pool.clone())),
        catalog_repo: Arc::new(MySqlCatalogRepo::new(pool.clone())),
        cart_repo: Arc::new(MySqlCartRepo::new(pool.clone())),
        favorites_repo: Arc::new(MySqlFavoritesRepo::new(pool.clone())),
        profile_repo: Arc::new(MySqlProfileRepo::new(pool.clone())),
        promocode_repo: Arc::new(MySqlPromocodeRepo::new(pool)),
        session_store,
        tx_manager,
    })
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let backend = match settings.store.backend.as_str() {
            "memory" => memory_backend(),
            "mysql" => mysql_backend(settings).await?,
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});
        let key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| "my-dev-secret-key".to_string())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            signing_key: key,
        }));

        let auth_service: Arc<dyn AuthService> = match settings.auth.backend.as_str() {
            "fake" => Arc::new(FakeAuthService::new()),
            "real" => Arc::new(RealAuthService::new(
                backend.auth_repo.clone(),
                backend.user_repo.clone(),
                credential_hasher,
                token_codec,
                backend.session_store.clone(),
                backend.tx_manager.clone(),
            )),
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };

        // one shared store, partitioned by key prefix per resource class
        let cache_store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());

        let cart_service: Arc<dyn CartService> = Arc::new(CachedCartService::new(
            backend.user_repo.clone(),
            backend.catalog_repo.clone(),
            backend.cart_repo.clone(),
            backend.tx_manager.clone(),
            ResourceCache::new(
                cache_store.clone(),
                "cart",
                Duration::from_secs(settings.cache.cart_ttl_secs),
            ),
        ));

        let favorites_service: Arc<dyn FavoritesService> = Arc::new(CachedFavoritesService::new(
            backend.user_repo.clone(),
            backend.catalog_repo.clone(),
            backend.favorites_repo.clone(),
            backend.tx_manager.clone(),
            ResourceCache::new(
                cache_store.clone(),
                "favorites",
                Duration::from_secs(settings.cache.favorites_ttl_secs),
            ),
        ));

        let profile_service: Arc<dyn ProfileService> = Arc::new(CachedProfileService::new(
            backend.user_repo.clone(),
            backend.profile_repo.clone(),
            backend.tx_manager.clone(),
            ResourceCache::new(
                cache_store.clone(),
                "profile",
                Duration::from_secs(settings.cache.profile_ttl_secs),
            ),
        ));

        let promocode_service: Arc<dyn PromocodeService> = Arc::new(CachedPromocodeService::new(
            backend.user_repo.clone(),
            backend.promocode_repo.clone(),
            backend.tx_manager.clone(),
            ResourceCache::new(
                cache_store,
                "promo",
                Duration::from_secs(settings.cache.promocode_ttl_secs),
            ),
        ));

        Ok(Server {
            auth_service,
            cart_service,
            favorites_service,
            profile_service,
            promocode_service,
        })
    }
}
