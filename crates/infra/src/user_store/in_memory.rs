use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use gatehouse_auth::{PageRequest, StoreError, TokenPatch, UserField, UserKey, UserPage, UserRecord, UserStore};
use gatehouse_core::UserId;

/// In-memory user store.
///
/// Intended for tests/dev. Lookups by email or phone scan every record.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, read through a poisoned lock if need be.
    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

fn taken(users: &HashMap<UserId, UserRecord>, record: &UserRecord) -> Option<UserField> {
    if users.contains_key(&record.user_id) {
        return Some(UserField::UserId);
    }
    let clash = |field: UserField, value: &Option<String>| {
        let value = value.as_ref()?;
        let key = match field {
            UserField::Email => UserKey::Email(value.clone()),
            _ => UserKey::Phone(value.clone()),
        };
        users.values().any(|u| u.matches(&key)).then_some(field)
    };
    clash(UserField::Email, &record.email).or_else(|| clash(UserField::Phone, &record.phone))
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn count_where(&self, key: &UserKey) -> Result<u64, StoreError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users.values().filter(|u| u.matches(key)).count() as u64)
    }

    async fn find_one_where(&self, key: &UserKey) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        if let UserKey::UserId(id) = key {
            return Ok(users.get(id).cloned());
        }
        Ok(users.values().find(|u| u.matches(key)).cloned())
    }

    async fn insert_one(&self, record: &UserRecord) -> Result<UserId, StoreError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        if let Some(field) = taken(&users, record) {
            return Err(StoreError::Duplicate(field.to_string()));
        }
        users.insert(record.user_id, record.clone());
        Ok(record.user_id)
    }

    async fn upsert_where(&self, key: &UserKey, patch: &TokenPatch) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        if let Some(existing) = users.values_mut().find(|u| u.matches(key)) {
            existing.apply(patch);
            return Ok(());
        }

        let mut bare = match key {
            UserKey::UserId(id) => UserRecord::bare(*id),
            UserKey::Email(email) => UserRecord {
                email: Some(email.clone()),
                ..UserRecord::bare(UserId::new())
            },
            UserKey::Phone(phone) => UserRecord {
                phone: Some(phone.clone()),
                ..UserRecord::bare(UserId::new())
            },
        };
        bare.apply(patch);
        tracing::debug!(user_id = %bare.user_id, field = %key.field(), "upsert created bare record");
        users.insert(bare.user_id, bare);
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<UserPage, StoreError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<&UserRecord> = users.values().collect();
        all.sort_by_key(|u| u.user_id);

        let start = usize::try_from(page.start_index).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        Ok(UserPage {
            total_count: all.len() as u64,
            items: all.into_iter().skip(start).take(limit).cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gatehouse_auth::Role;

    use super::*;

    fn record(email: &str, phone: &str) -> UserRecord {
        UserRecord {
            email: Some(email.to_string()),
            phone: Some(phone.to_string()),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            user_type: Some(Role::User),
            ..UserRecord::bare(UserId::new())
        }
    }

    fn patch(token: &str) -> TokenPatch {
        TokenPatch {
            token: token.to_string(),
            refresh_token: format!("{token}-refresh"),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_enforces_each_unique_field() {
        let store = InMemoryUserStore::new();
        let first = record("a@x.com", "555");
        store.insert_one(&first).await.unwrap();

        assert_eq!(
            store.insert_one(&first).await,
            Err(StoreError::Duplicate("user_id".into()))
        );
        assert_eq!(
            store.insert_one(&record("a@x.com", "666")).await,
            Err(StoreError::Duplicate("email".into()))
        );
        assert_eq!(
            store.insert_one(&record("b@x.com", "555")).await,
            Err(StoreError::Duplicate("phone".into()))
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn count_and_find_by_each_key() {
        let store = InMemoryUserStore::new();
        let rec = record("a@x.com", "555");
        store.insert_one(&rec).await.unwrap();

        assert_eq!(store.count_where(&UserKey::Email("a@x.com".into())).await.unwrap(), 1);
        assert_eq!(store.count_where(&UserKey::Phone("555".into())).await.unwrap(), 1);
        assert_eq!(store.count_where(&UserKey::Phone("a@x.com".into())).await.unwrap(), 0);

        let by_id = store.find_one_where(&UserKey::UserId(rec.user_id)).await.unwrap();
        assert_eq!(by_id, Some(rec.clone()));
        let by_phone = store.find_one_where(&UserKey::Phone("555".into())).await.unwrap();
        assert_eq!(by_phone.map(|u| u.user_id), Some(rec.user_id));
    }

    #[tokio::test]
    async fn upsert_updates_only_token_fields() {
        let store = InMemoryUserStore::new();
        let rec = record("a@x.com", "555");
        store.insert_one(&rec).await.unwrap();

        store.upsert_where(&UserKey::UserId(rec.user_id), &patch("t1")).await.unwrap();
        let after = store.find_one_where(&UserKey::UserId(rec.user_id)).await.unwrap().unwrap();

        assert_eq!(after.token.as_deref(), Some("t1"));
        assert_eq!(after.refresh_token.as_deref(), Some("t1-refresh"));
        assert_eq!(after.email, rec.email);
        assert_eq!(after.phone, rec.phone);
        assert_eq!(after.created_at, rec.created_at);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn upsert_without_match_creates_bare_record() {
        let store = InMemoryUserStore::new();
        let id = UserId::new();
        store.upsert_where(&UserKey::UserId(id), &patch("t")).await.unwrap();

        let bare = store.find_one_where(&UserKey::UserId(id)).await.unwrap().unwrap();
        assert_eq!(bare.token.as_deref(), Some("t"));
        assert!(bare.email.is_none());
        assert!(bare.password_hash.is_none());

        store.upsert_where(&UserKey::Email("z@x.com".into()), &patch("u")).await.unwrap();
        assert_eq!(store.count_where(&UserKey::Email("z@x.com".into())).await.unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn list_is_ordered_and_windowed() {
        let store = InMemoryUserStore::new();
        for i in 0..5 {
            store
                .insert_one(&record(&format!("u{i}@x.com"), &format!("{i}")))
                .await
                .unwrap();
        }

        let all = store.list(PageRequest { start_index: 0, limit: 10 }).await.unwrap();
        assert_eq!(all.total_count, 5);
        let ids: Vec<_> = all.items.iter().map(|u| u.user_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let window = store.list(PageRequest { start_index: 3, limit: 10 }).await.unwrap();
        assert_eq!(window.total_count, 5);
        assert_eq!(window.items.len(), 2);
        assert_eq!(window.items[0].user_id, ids[3]);

        let past_end = store.list(PageRequest { start_index: 9, limit: 2 }).await.unwrap();
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn poisoned_lock_still_reports_its_size() {
        let store = std::sync::Arc::new(InMemoryUserStore::new());
        store.insert_one(&record("a@x.com", "555")).await.unwrap();

        let writer = store.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = writer.users.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(crashed.is_err());
        assert!(store.users.is_poisoned());

        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        assert!(matches!(
            store.count_where(&UserKey::Email("a@x.com".into())).await,
            Err(StoreError::Backend(_))
        ));
    }
}
