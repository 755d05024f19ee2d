use crate::error::{RegisterError, Result};
use crate::types::Member;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Storage trait for persisting merged member records.
///
/// Keys are member identity keys: the normalized mobile number, or the
/// generated fallback token for members without one.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn get_member(&self, id: &str) -> Result<Option<Member>>;
    async fn put_member(&self, member: &Member) -> Result<()>;
    async fn put_members(&self, members: &[Member]) -> Result<()>;
    async fn list_members(&self) -> Result<Vec<Member>>;
}

/// In-memory store for development/testing.
pub struct InMemoryMemberStore {
    members: Arc<Mutex<HashMap<String, Member>>>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self {
            members: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryMemberStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberStore for InMemoryMemberStore {
    async fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let members = self.members.lock().unwrap();
        Ok(members.get(id).cloned())
    }

    async fn put_member(&self, member: &Member) -> Result<()> {
        let mut members = self.members.lock().unwrap();
        members.insert(member.id.clone(), member.clone());

        debug!("Stored member: {} with id {}", member.name, member.id);
        Ok(())
    }

    async fn put_members(&self, batch: &[Member]) -> Result<()> {
        let mut members = self.members.lock().unwrap();
        for member in batch {
            members.insert(member.id.clone(), member.clone());
        }

        debug!("Stored batch of {} members", batch.len());
        Ok(())
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        let members = self.members.lock().unwrap();
        let mut listed: Vec<Member> = members.values().cloned().collect();

        // Sort by name then id so listings are stable across runs
        listed.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(listed)
    }
}

/// File-backed store: one JSON document holding every member, loaded on
/// open and rewritten on every save.
pub struct JsonFileMemberStore {
    path: PathBuf,
    members: Arc<Mutex<HashMap<String, Member>>>,
}

impl JsonFileMemberStore {
    pub fn open(path: &Path) -> Result<Self> {
        let mut members = HashMap::new();
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let loaded: Vec<Member> = serde_json::from_str(&raw)?;
            for member in loaded {
                members.insert(member.id.clone(), member);
            }
            debug!("Loaded {} members from {}", members.len(), path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
            members: Arc::new(Mutex::new(members)),
        })
    }

    fn flush(&self, members: &HashMap<String, Member>) -> Result<()> {
        let mut ordered: Vec<&Member> = members.values().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));
        let json = serde_json::to_string_pretty(&ordered)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json).map_err(|e| {
            RegisterError::Store(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl MemberStore for JsonFileMemberStore {
    async fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let members = self.members.lock().unwrap();
        Ok(members.get(id).cloned())
    }

    async fn put_member(&self, member: &Member) -> Result<()> {
        let mut members = self.members.lock().unwrap();
        members.insert(member.id.clone(), member.clone());
        self.flush(&members)?;

        debug!("Stored member: {} with id {}", member.name, member.id);
        Ok(())
    }

    async fn put_members(&self, batch: &[Member]) -> Result<()> {
        let mut members = self.members.lock().unwrap();
        for member in batch {
            members.insert(member.id.clone(), member.clone());
        }
        self.flush(&members)?;

        debug!("Stored batch of {} members", batch.len());
        Ok(())
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        let members = self.members.lock().unwrap();
        let mut listed: Vec<Member> = members.values().cloned().collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(listed)
    }
}
