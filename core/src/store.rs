//! Client-local persistent state: the auth session and the theme flag.
//!
//! `LocalStore` is a string key/value store in the spirit of a browser's
//! local storage. The core only ships the in-memory implementation; hosts
//! provide a durable one.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::types::Usuario;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user_data";
pub const THEME_KEY: &str = "theme";

pub trait LocalStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

impl<S: LocalStore + ?Sized> LocalStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Token plus the profile it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub usuario: Option<Usuario>,
}

impl Session {
    /// Read a session back. A token without a readable profile is still a
    /// session; the profile is refreshed from `/auth/me`.
    pub fn load(store: &impl LocalStore) -> Option<Self> {
        let token = store.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
        let usuario = store
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok());
        Some(Self { token, usuario })
    }

    pub fn save(&self, store: &mut impl LocalStore) -> Result<(), StoreError> {
        store.set(TOKEN_KEY, &self.token)?;
        match &self.usuario {
            Some(usuario) => store.set(USER_KEY, &serde_json::to_string(usuario)?),
            None => store.remove(USER_KEY),
        }
    }

    pub fn clear(store: &mut impl LocalStore) -> Result<(), StoreError> {
        store.remove(TOKEN_KEY)?;
        store.remove(USER_KEY)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Unknown or missing values fall back to light.
    pub fn load(store: &impl LocalStore) -> Self {
        match store.get(THEME_KEY).as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn save(self, store: &mut impl LocalStore) -> Result<(), StoreError> {
        store.set(THEME_KEY, self.as_str())
    }
}
