use entities::User;

use super::{ServiceContext, WriteHandle};
use crate::{change_hub::Table, error::AppResult};

/// Service for the signed-in user's own row.
#[derive(Clone)]
pub struct UserService {
    ctx: ServiceContext,
}

impl UserService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Creates the user row on first launch; an existing row is left as is.
    pub async fn ensure_user(&self) -> AppResult<WriteHandle<User>> {
        let identity = self.ctx.identity.require()?;
        let uid = identity.uid.clone();

        self.ctx
            .write(&uid, &[Table::Users], move |store| async move {
                if let Some(existing) = store.get_user(&identity.uid).await? {
                    return Ok(existing);
                }
                let user = User::new(identity.uid, identity.email);
                store.upsert_user(&user).await?;
                tracing::info!(uid = %user.uid, "Created user");
                Ok(user)
            })
            .await
    }

    pub async fn current_user(&self) -> AppResult<Option<User>> {
        let uid = self.ctx.uid()?;
        Ok(self.ctx.store.get_user(&uid).await?)
    }

    /// Deletes the user together with all of their data.
    pub async fn delete_current_user(&self) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        let target = uid.clone();

        self.ctx
            .write(&uid, Table::ALL, move |store| async move {
                store.delete_user(&target).await?;
                tracing::info!(uid = %target, "Deleted user and all their data");
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        identity::StaticIdentity,
        services::test_support::{context_with, signed_in, UID},
    };

    #[tokio::test]
    async fn test_ensure_user_creates_once() {
        let ctx = signed_in().await;
        let users = UserService::new(ctx.clone());

        let user = users.current_user().await.unwrap().unwrap();
        assert_eq!(user, User::new(UID, "driver@example.com"));

        // A second call keeps the stored row
        ctx.store
            .upsert_user(&User::new(UID, "changed@example.com"))
            .await
            .unwrap();
        let again = users.ensure_user().await.unwrap().await.unwrap();
        assert_eq!(again.email, "changed@example.com");
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let users = UserService::new(context_with(StaticIdentity::anonymous()));

        assert!(matches!(
            users.ensure_user().await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            users.current_user().await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_delete_current_user() {
        let ctx = signed_in().await;
        let users = UserService::new(ctx.clone());

        users.delete_current_user().await.unwrap().await.unwrap();
        assert!(users.current_user().await.unwrap().is_none());
    }
}
