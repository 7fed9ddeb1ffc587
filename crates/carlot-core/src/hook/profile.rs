use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheState, CacheWatch, EntityCache, FetchOutcome};
use crate::context::AppContext;
use crate::error::CoreError;
use crate::model::{ProfilePatch, UserProfile};

/// The signed-in user's own profile.
///
/// Seeded from the session; every successful fetch or update is written
/// back into `SessionStore` so the guard and other views see it.
pub struct ProfileHook {
    ctx: AppContext,
    cache: EntityCache<UserProfile, ()>,
}

impl ProfileHook {
    pub fn new(ctx: &AppContext) -> Self {
        let cache = EntityCache::new();
        if let Some(user) = ctx.session().user() {
            cache.replace(Some(UserProfile::clone(&user)));
        }
        Self {
            ctx: ctx.clone(),
            cache,
        }
    }

    pub async fn mount(ctx: &AppContext) -> Self {
        let hook = Self::new(ctx);
        hook.fetch().await;
        hook
    }

    pub async fn fetch(&self) -> FetchOutcome {
        if !self.ctx.session().has_token() {
            return FetchOutcome::Skipped;
        }
        let api = Arc::clone(&self.ctx.gateways().profile);
        let outcome = self
            .cache
            .fetch((), async move { api.current_user().await })
            .await;
        match &outcome {
            FetchOutcome::Applied => {
                if let Some(user) = self.cache.data() {
                    self.ctx.session().set_user(UserProfile::clone(&user));
                }
            }
            FetchOutcome::Failed(err) => self.ctx.reporter().report(err),
            _ => {}
        }
        debug!(?outcome, "profile fetch");
        outcome
    }

    pub async fn update(&self, patch: &ProfilePatch) -> Result<Arc<UserProfile>, CoreError> {
        match self.ctx.gateways().profile.update_profile(patch).await {
            Ok(user) => {
                self.cache.replace(Some(user.clone()));
                Ok(self.ctx.session().set_user(user))
            }
            Err(err) => {
                self.ctx.reporter().report(&err);
                Err(err)
            }
        }
    }

    pub fn profile(&self) -> Option<Arc<UserProfile>> {
        self.cache.data()
    }

    pub fn state(&self) -> CacheState<UserProfile, ()> {
        self.cache.snapshot()
    }

    pub fn watch(&self) -> CacheWatch<UserProfile, ()> {
        CacheWatch::new(self.cache.subscribe())
    }

    pub fn unmount(&self) {
        self.cache.unmount();
    }
}

impl Drop for ProfileHook {
    fn drop(&mut self) {
        self.cache.unmount();
    }
}

impl std::fmt::Debug for ProfileHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileHook")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
