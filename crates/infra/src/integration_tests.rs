//! Integration tests for the account lifecycle.
//!
//! Tests: Signup → Store → Login → Token refresh → Guards
//!
//! Verifies:
//! - Stored credentials are hashed and verifiable
//! - Email and phone uniqueness hold, including under concurrent signups
//! - Login failures do not reveal which factor was wrong
//! - Issued tokens drive the access guards as expected

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use gatehouse_auth::{
        AccountService, AuthError, AuthzError, CredentialHasher, ErrorKind, HashCost, LoginRequest,
        PageRequest, Principal, Role, SignupRequest, SigningSecret, StoreError, TokenPair,
        TokenPatch, TokenService, TokenStoreSync, UserKey, UserPage, UserRecord, UserStore,
        Verification, require_ownership_or_admin, require_role,
    };
    use gatehouse_core::UserId;

    use crate::user_store::InMemoryUserStore;

    fn cheap_hasher() -> CredentialHasher {
        CredentialHasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    fn tokens() -> Arc<TokenService> {
        let secret = SigningSecret::new(b"integration-secret".to_vec()).unwrap();
        Arc::new(TokenService::new(&secret))
    }

    fn setup() -> (AccountService, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let service = AccountService::new(store.clone(), tokens(), cheap_hasher(), Duration::from_secs(5));
        (service, store)
    }

    fn signup_request(email: &str, phone: &str, role: Role) -> SignupRequest {
        SignupRequest {
            email: Some(email.to_string()),
            phone: Some(phone.to_string()),
            password: Some("secret".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            user_type: Some(role),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn signup_stores_a_verifiable_hash_and_tokens() {
        let (service, store) = setup();
        let id = service.signup(signup_request("a@x.com", "555", Role::User)).await.unwrap();

        let record = store.find_one_where(&UserKey::UserId(id)).await.unwrap().unwrap();
        let hash = record.password_hash.clone().unwrap();
        assert_ne!(hash, "secret");
        assert_eq!(cheap_hasher().verify(&hash, "secret"), Verification::Match);
        assert!(!cheap_hasher().verify(&hash, "Secret").is_match());

        assert_eq!(record.user_type, Some(Role::User));
        assert!(record.created_at.is_some());
        assert_eq!(record.created_at, record.updated_at);

        let claims = service.tokens().validate(record.token.as_deref().unwrap(), Utc::now()).unwrap();
        assert_eq!(claims.uid, Some(id));
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn duplicate_email_or_phone_conflicts_without_writing() {
        let (service, store) = setup();
        service.signup(signup_request("a@x.com", "555", Role::User)).await.unwrap();

        let same_email = service.signup(signup_request("a@x.com", "666", Role::User)).await.unwrap_err();
        assert_eq!(same_email.kind(), ErrorKind::Conflict);
        assert_eq!(same_email.to_string(), "this email or phone number already exists");

        let same_phone = service.signup(signup_request("b@x.com", "555", Role::User)).await.unwrap_err();
        assert_eq!(same_phone.kind(), ErrorKind::Conflict);

        assert_eq!(store.len(), 1);
        assert_eq!(store.count_where(&UserKey::Phone("666".into())).await.unwrap(), 0);
        assert_eq!(store.count_where(&UserKey::Email("b@x.com".into())).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_signup_never_reaches_the_store() {
        let (service, store) = setup();
        let mut req = signup_request("a@x.com", "555", Role::User);
        req.password = Some("12345".to_string());

        let err = service.signup(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_signups_admit_exactly_one() {
        let (service, store) = setup();
        let a = service.clone();
        let b = service.clone();

        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.signup(signup_request("race@x.com", "1", Role::User)).await }),
            tokio::spawn(async move { b.signup(signup_request("race@x.com", "2", Role::User)).await }),
        );
        let results = [first.unwrap(), second.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(loser.kind(), ErrorKind::Conflict);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn login_refreshes_and_returns_the_stored_record() {
        let (service, _store) = setup();
        let id = service.signup(signup_request("a@x.com", "555", Role::Admin)).await.unwrap();

        let record = service.login(login_request("a@x.com", "secret")).await.unwrap();
        assert_eq!(record.user_id, id);
        assert!(record.updated_at.is_some());
        assert_eq!(record.updated_at.map(|t| t.timestamp_subsec_nanos()), Some(0));

        let claims = service.tokens().validate(record.token.as_deref().unwrap(), Utc::now()).unwrap();
        let principal = Principal::from_claims(&claims);
        assert_eq!(principal.role(), Some(Role::Admin));
        assert_eq!(principal.user_id(), Some(&id));
        assert!(require_role(&principal, Role::Admin).is_ok());
        assert!(require_ownership_or_admin(&principal, &UserId::new()).is_ok());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (service, _store) = setup();
        service.signup(signup_request("a@x.com", "555", Role::User)).await.unwrap();

        let wrong_password = service.login(login_request("a@x.com", "not-it")).await.unwrap_err();
        let unknown_email = service.login(login_request("nobody@x.com", "secret")).await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.to_string(), "email or password is incorrect");
        assert_eq!(wrong_password.kind(), unknown_email.kind());
    }

    #[tokio::test]
    async fn refresh_token_grants_nothing() {
        let (service, _store) = setup();
        service.signup(signup_request("a@x.com", "555", Role::Admin)).await.unwrap();
        let record = service.login(login_request("a@x.com", "secret")).await.unwrap();

        let claims = service
            .tokens()
            .validate(record.refresh_token.as_deref().unwrap(), Utc::now())
            .unwrap();
        assert!(!claims.has_identity());

        let principal = Principal::from_claims(&claims);
        assert_eq!(require_role(&principal, Role::Admin), Err(AuthzError::MissingRole));
        assert_eq!(
            require_ownership_or_admin(&principal, &record.user_id),
            Err(AuthzError::MissingRole)
        );
    }

    #[tokio::test]
    async fn user_may_only_reach_own_record() {
        let (service, _store) = setup();
        let mine = service.signup(signup_request("a@x.com", "555", Role::User)).await.unwrap();
        let theirs = service.signup(signup_request("b@x.com", "666", Role::User)).await.unwrap();

        let record = service.login(login_request("a@x.com", "secret")).await.unwrap();
        let claims = service.tokens().validate(record.token.as_deref().unwrap(), Utc::now()).unwrap();
        let principal = Principal::from_claims(&claims);

        assert!(require_ownership_or_admin(&principal, &mine).is_ok());
        assert_eq!(
            require_ownership_or_admin(&principal, &theirs),
            Err(AuthzError::Forbidden)
        );
        assert_eq!(require_role(&principal, Role::Admin), Err(AuthzError::Forbidden));
    }

    #[tokio::test]
    async fn persist_tokens_is_idempotent_and_creates_bare_records() {
        let store = Arc::new(InMemoryUserStore::new());
        let sync = TokenStoreSync::new(store.clone(), Duration::from_secs(5));
        let pair = TokenPair {
            access: "access".to_string(),
            refresh: "refresh".to_string(),
        };
        let now = Utc::now();
        let id = UserId::new();

        sync.persist_tokens(id, &pair, now).await.unwrap();
        sync.persist_tokens(id, &pair, now).await.unwrap();

        assert_eq!(store.len(), 1);
        let bare = store.find_one_where(&UserKey::UserId(id)).await.unwrap().unwrap();
        assert_eq!(bare.token.as_deref(), Some("access"));
        assert_eq!(bare.refresh_token.as_deref(), Some("refresh"));
        assert!(bare.email.is_none());
        assert!(bare.updated_at.unwrap() <= now);
    }

    #[tokio::test]
    async fn login_against_bare_record_is_rejected() {
        let (service, store) = setup();
        let patch = TokenPatch {
            token: "t".to_string(),
            refresh_token: "r".to_string(),
            updated_at: Utc::now(),
        };
        store.upsert_where(&UserKey::Email("ghost@x.com".into()), &patch).await.unwrap();

        let err = service.login(login_request("ghost@x.com", "secret")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    /// Store whose every call parks until the test clock runs out.
    struct StalledStore;

    #[async_trait::async_trait]
    impl UserStore for StalledStore {
        async fn count_where(&self, _key: &UserKey) -> Result<u64, StoreError> {
            std::future::pending().await
        }

        async fn find_one_where(&self, _key: &UserKey) -> Result<Option<UserRecord>, StoreError> {
            std::future::pending().await
        }

        async fn insert_one(&self, _record: &UserRecord) -> Result<UserId, StoreError> {
            std::future::pending().await
        }

        async fn upsert_where(&self, _key: &UserKey, _patch: &TokenPatch) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn list(&self, _page: PageRequest) -> Result<UserPage, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_storage_times_out_as_infrastructure_error() {
        let limit = Duration::from_secs(100);
        let service = AccountService::new(Arc::new(StalledStore), tokens(), cheap_hasher(), limit);

        let signup = service.signup(signup_request("a@x.com", "555", Role::User)).await.unwrap_err();
        assert!(matches!(signup, AuthError::Store(StoreError::Timeout(d)) if d == limit));
        assert_eq!(signup.kind(), ErrorKind::Infrastructure);

        let login = service.login(login_request("a@x.com", "secret")).await.unwrap_err();
        assert!(matches!(login, AuthError::Store(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn listing_pages_through_all_accounts() {
        let (service, store) = setup();
        for i in 0..3 {
            service
                .signup(signup_request(&format!("u{i}@x.com"), &format!("55{i}"), Role::User))
                .await
                .unwrap();
        }

        let page = store.list(PageRequest::from_query(Some(2), Some(2), None)).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items.len(), 1);
    }
}
