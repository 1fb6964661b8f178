use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::auth::{Actor, Caller, Role, StaffScope};
use shared_models::error::AppError;

use crate::jwt::validate_token;

// Middleware for authentication
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let caller = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

pub fn require_role(caller: &Caller, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&caller.role) {
        Ok(())
    } else {
        warn!("User {} with role {} denied, requires one of {:?}", caller.id, caller.role, allowed);
        Err(AppError::Forbidden(format!("Role {} is not permitted here", caller.role)))
    }
}

/// Turns an authenticated caller into an [`Actor`], loading the staff
/// record for STAFF callers.
pub async fn resolve_actor(store: &dyn ClinicStore, caller: &Caller) -> Result<Actor, AppError> {
    match caller.role {
        Role::User => Ok(Actor::Patient {
            user_id: caller.id,
            email: caller.email.clone(),
        }),
        Role::Admin => Ok(Actor::Admin { user_id: caller.id }),
        Role::Staff => {
            let staff = store.staff_for_user(caller.id).await.map_err(|e| {
                error!("Failed to load staff record for {}: {}", caller.id, e);
                AppError::Internal("Failed to resolve staff scope".to_string())
            })?;

            match staff {
                Some(staff) => Ok(Actor::Staff {
                    user_id: caller.id,
                    scope: StaffScope {
                        organization_id: staff.organization_id,
                        department_id: staff.department_id,
                    },
                }),
                None => Err(AppError::Forbidden(
                    "Staff account not found or inactive".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_database::InMemoryStore;
    use uuid::Uuid;

    use crate::test_utils::ClinicFixture;

    fn caller(role: Role) -> Caller {
        Caller { id: Uuid::new_v4(), email: None, role, issued_at: None }
    }

    #[test]
    fn require_role_filters_callers() {
        assert!(require_role(&caller(Role::Staff), &[Role::Staff, Role::Admin]).is_ok());
        assert_matches!(
            require_role(&caller(Role::User), &[Role::Staff]),
            Err(AppError::Forbidden(_))
        );
    }

    #[tokio::test]
    async fn staff_without_record_is_forbidden() {
        let store = InMemoryStore::new();
        let result = resolve_actor(&store, &caller(Role::Staff)).await;
        assert_matches!(result, Err(AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn staff_resolves_to_scope() {
        let fixture = ClinicFixture::seeded(2, 30).await;
        let (staff_user, _) = fixture.add_staff(Some(fixture.department.id)).await;

        let actor = resolve_actor(
            fixture.store.as_ref(),
            &Caller { id: staff_user.id, email: None, role: Role::Staff, issued_at: None },
        )
        .await
        .unwrap();

        assert_matches!(actor, Actor::Staff { scope, .. } if scope.department_id == Some(fixture.department.id));
    }
}
