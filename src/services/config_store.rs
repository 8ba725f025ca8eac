//! Server configuration store.
//!
//! Keeps the configured GitLab servers and the selected server id, once for
//! the application and once per project. The two scopes are independent
//! stores. Persistence is delegated to a [`ConfigPersistence`]
//! implementation; without one the store lives in memory only.

use crate::error::AppError;
use crate::models::ServerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which store a configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    /// Shared by every project; holds only default servers.
    Application,
    /// Local to one project.
    Project,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Project => "project",
        }
    }
}

/// The persisted form of one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub selected_server_id: Option<String>,
}

/// Loads and saves store contents as an opaque blob.
pub trait ConfigPersistence: Send + Sync {
    /// Previously saved contents, or `None` if nothing was saved yet.
    fn load(&self, scope: ConfigScope) -> Result<Option<PersistedConfig>, AppError>;

    fn save(&self, scope: ConfigScope, config: &PersistedConfig) -> Result<(), AppError>;
}

/// Stores each scope as `gitlab-servers.<scope>.json` in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileConfigPersistence {
    dir: PathBuf,
}

impl JsonFileConfigPersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `scope`.
    pub fn file_path(&self, scope: ConfigScope) -> PathBuf {
        self.dir.join(format!("gitlab-servers.{}.json", scope.as_str()))
    }
}

impl ConfigPersistence for JsonFileConfigPersistence {
    fn load(&self, scope: ConfigScope) -> Result<Option<PersistedConfig>, AppError> {
        let path = self.file_path(scope);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| io_error("read", &path, e))?;
        let config = serde_json::from_str(&text).map_err(|e| {
            AppError::persistence(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        Ok(Some(config))
    }

    fn save(&self, scope: ConfigScope, config: &PersistedConfig) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error("create", &self.dir, e))?;

        let path = self.file_path(scope);
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(config)?;
        fs::write(&tmp, text).map_err(|e| io_error("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error("replace", &path, e))?;

        log::debug!("Saved {} server config to {}", scope.as_str(), path.display());
        Ok(())
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> AppError {
    AppError::persistence(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Keyed store of server configurations for one scope.
pub struct ServerConfigStore {
    scope: ConfigScope,
    servers: Vec<ServerConfig>,
    selected_id: Option<String>,
    persistence: Option<Arc<dyn ConfigPersistence>>,
}

impl std::fmt::Debug for ServerConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfigStore")
            .field("scope", &self.scope)
            .field("servers", &self.servers.len())
            .field("selected_id", &self.selected_id)
            .finish()
    }
}

impl ServerConfigStore {
    /// An empty store that is never persisted.
    pub fn in_memory(scope: ConfigScope) -> Self {
        Self {
            scope,
            servers: Vec::new(),
            selected_id: None,
            persistence: None,
        }
    }

    /// Load the store for `scope`; every later change is saved back.
    pub fn open(scope: ConfigScope, persistence: Arc<dyn ConfigPersistence>) -> Result<Self, AppError> {
        let saved = persistence.load(scope)?.unwrap_or_default();
        log::debug!(
            "Loaded {} {} server configs",
            saved.servers.len(),
            scope.as_str()
        );
        Ok(Self {
            scope,
            servers: saved.servers,
            selected_id: saved.selected_server_id,
            persistence: Some(persistence),
        })
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn list(&self) -> &[ServerConfig] {
        &self.servers
    }

    pub fn get_by_id(&self, id: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// The selected config, if the selected id still exists.
    pub fn get_selected(&self) -> Option<&ServerConfig> {
        self.selected_id.as_deref().and_then(|id| self.get_by_id(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    /// Application-wide (default) configs.
    pub fn default_servers(&self) -> Vec<&ServerConfig> {
        self.servers.iter().filter(|s| s.is_default).collect()
    }

    /// Add a config.
    ///
    /// The application scope accepts only default configs. Ids must be unique.
    pub fn add(&mut self, config: ServerConfig) -> Result<(), AppError> {
        self.check_scope(&config)?;
        if self.get_by_id(&config.id).is_some() {
            return Err(AppError::invalid_input_field(
                format!("Server {} already exists", config.id),
                "id",
            ));
        }
        let mut servers = self.servers.clone();
        servers.push(config);
        self.commit(servers, self.selected_id.clone())
    }

    /// Replace the config with the same id. Returns whether one was found.
    pub fn update(&mut self, config: ServerConfig) -> Result<bool, AppError> {
        self.check_scope(&config)?;
        let Some(index) = self.servers.iter().position(|s| s.id == config.id) else {
            return Ok(false);
        };
        let mut servers = self.servers.clone();
        servers[index] = config;
        self.commit(servers, self.selected_id.clone())?;
        Ok(true)
    }

    /// Remove a config, clearing the selection if it pointed at it.
    /// Returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, AppError> {
        let servers: Vec<ServerConfig> =
            self.servers.iter().filter(|s| s.id != id).cloned().collect();
        let removed = servers.len() != self.servers.len();
        let clears_selection = self.selected_id.as_deref() == Some(id);
        if removed || clears_selection {
            let selected_id = self.selected_id.clone().filter(|_| !clears_selection);
            self.commit(servers, selected_id)?;
        }
        Ok(removed)
    }

    pub fn set_selected(&mut self, id: Option<&str>) -> Result<(), AppError> {
        self.commit(self.servers.clone(), id.map(String::from))
    }

    /// Remove every config and the selection.
    pub fn clear(&mut self) -> Result<(), AppError> {
        self.commit(Vec::new(), None)
    }

    fn check_scope(&self, config: &ServerConfig) -> Result<(), AppError> {
        if self.scope == ConfigScope::Application && !config.is_default {
            return Err(AppError::invalid_input_field(
                "Only default servers can be stored application-wide",
                "isDefault",
            ));
        }
        Ok(())
    }

    /// Save the new contents, then adopt them. A failed save leaves the
    /// store unchanged.
    fn commit(
        &mut self,
        servers: Vec<ServerConfig>,
        selected_id: Option<String>,
    ) -> Result<(), AppError> {
        let config = PersistedConfig {
            servers,
            selected_server_id: selected_id,
        };
        if let Some(persistence) = &self.persistence {
            persistence.save(self.scope, &config)?;
        }
        self.servers = config.servers;
        self.selected_id = config.selected_server_id;
        Ok(())
    }
}

/// Pick the server a browsing session should use.
///
/// Order: the project's selected server, the application's selected server,
/// the first default application server, then the first project server,
/// which becomes the project's selection.
pub fn resolve_active(
    app: &ServerConfigStore,
    project: &mut ServerConfigStore,
) -> Result<Option<ServerConfig>, AppError> {
    if let Some(server) = project.get_selected() {
        return Ok(Some(server.clone()));
    }
    if let Some(server) = app.get_selected().or_else(|| app.default_servers().into_iter().next()) {
        return Ok(Some(server.clone()));
    }

    let Some(fallback) = project.list().first().cloned() else {
        return Ok(None);
    };
    log::info!("No server selected, falling back to {}", fallback.label());
    project.set_selected(Some(&fallback.id))?;
    Ok(Some(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn server(name: &str, is_default: bool) -> ServerConfig {
        ServerConfig::new(name, &format!("https://{}.example.com/", name), "token", is_default)
    }

    #[test]
    fn test_application_scope_rejects_project_configs() {
        let mut store = ServerConfigStore::in_memory(ConfigScope::Application);
        let err = store.add(server("local", false)).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput { .. }));
        assert!(store.list().is_empty());

        store.add(server("shared", true)).unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_project_scope_accepts_any_config() {
        let mut store = ServerConfigStore::in_memory(ConfigScope::Project);
        store.add(server("a", false)).unwrap();
        store.add(server("b", true)).unwrap();
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.default_servers().len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = ServerConfigStore::in_memory(ConfigScope::Project);
        let config = server("a", false);
        store.add(config.clone()).unwrap();
        assert!(store.add(config).is_err());
    }

    #[test]
    fn test_update_replaces_by_id() {
        let mut store = ServerConfigStore::in_memory(ConfigScope::Project);
        let mut config = server("a", false);
        store.add(config.clone()).unwrap();

        config.name = "renamed".into();
        assert!(store.update(config.clone()).unwrap());
        assert_eq!(store.get_by_id(&config.id).unwrap().name, "renamed");

        assert!(!store.update(server("ghost", false)).unwrap());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut store = ServerConfigStore::in_memory(ConfigScope::Project);
        let a = server("a", false);
        let b = server("b", false);
        store.add(a.clone()).unwrap();
        store.add(b.clone()).unwrap();

        store.set_selected(Some(&b.id)).unwrap();
        assert!(store.remove(&a.id).unwrap());
        assert_eq!(store.selected_id(), Some(b.id.as_str()));

        assert!(store.remove(&b.id).unwrap());
        assert_eq!(store.selected_id(), None);
        assert!(store.get_selected().is_none());
        assert!(!store.remove("missing").unwrap());
    }

    #[test]
    fn test_clear() {
        let mut store = ServerConfigStore::in_memory(ConfigScope::Application);
        let a = server("a", true);
        store.add(a.clone()).unwrap();
        store.set_selected(Some(&a.id)).unwrap();
        store.clear().unwrap();
        assert!(store.list().is_empty());
        assert!(store.selected_id().is_none());
    }

    #[test]
    fn test_resolve_active_order() {
        let mut app = ServerConfigStore::in_memory(ConfigScope::Application);
        let mut project = ServerConfigStore::in_memory(ConfigScope::Project);
        assert!(resolve_active(&app, &mut project).unwrap().is_none());

        let local = server("local", false);
        project.add(local.clone()).unwrap();
        let chosen = resolve_active(&app, &mut project).unwrap().unwrap();
        assert_eq!(chosen.id, local.id);
        assert_eq!(project.selected_id(), Some(local.id.as_str()));

        project.set_selected(None).unwrap();
        let shared = server("shared", true);
        let other = server("other", true);
        app.add(shared.clone()).unwrap();
        app.add(other.clone()).unwrap();
        assert_eq!(resolve_active(&app, &mut project).unwrap().unwrap().id, shared.id);

        app.set_selected(Some(&other.id)).unwrap();
        assert_eq!(resolve_active(&app, &mut project).unwrap().unwrap().id, other.id);

        project.set_selected(Some(&local.id)).unwrap();
        assert_eq!(resolve_active(&app, &mut project).unwrap().unwrap().id, local.id);
    }

    #[test]
    fn test_json_file_persistence_round_trip() {
        let dir = tempdir().unwrap();
        let persistence: Arc<dyn ConfigPersistence> =
            Arc::new(JsonFileConfigPersistence::new(dir.path()));

        let a = server("a", false);
        {
            let mut store = ServerConfigStore::open(ConfigScope::Project, persistence.clone()).unwrap();
            assert!(store.list().is_empty());
            store.add(a.clone()).unwrap();
            store.set_selected(Some(&a.id)).unwrap();
        }

        let reopened = ServerConfigStore::open(ConfigScope::Project, persistence.clone()).unwrap();
        assert_eq!(reopened.list(), &[a.clone()]);
        assert_eq!(reopened.get_selected(), Some(&a));

        let app = ServerConfigStore::open(ConfigScope::Application, persistence).unwrap();
        assert!(app.list().is_empty());

        let file = dir.path().join("gitlab-servers.project.json");
        let text = std::fs::read_to_string(file).unwrap();
        assert!(text.contains("\"selectedServerId\""));
        assert!(text.contains("\"isDefault\": false"));
    }

    /// Keeps the last saved blob; fails every save while `fail` is set.
    #[derive(Default)]
    struct FlakyPersistence {
        saved: std::sync::Mutex<Option<PersistedConfig>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl ConfigPersistence for FlakyPersistence {
        fn load(&self, _scope: ConfigScope) -> Result<Option<PersistedConfig>, AppError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&self, _scope: ConfigScope, config: &PersistedConfig) -> Result<(), AppError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(AppError::persistence("disk full"));
            }
            *self.saved.lock().unwrap() = Some(config.clone());
            Ok(())
        }
    }

    #[test]
    fn test_failed_save_leaves_store_unchanged() {
        let persistence = Arc::new(FlakyPersistence::default());
        let mut store = ServerConfigStore::open(ConfigScope::Project, persistence.clone()).unwrap();
        let a = server("a", false);
        store.add(a.clone()).unwrap();
        store.set_selected(Some(&a.id)).unwrap();

        persistence.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let mut renamed = a.clone();
        renamed.name = "renamed".into();

        assert!(store.add(server("b", false)).is_err());
        assert!(store.update(renamed).is_err());
        assert!(store.remove(&a.id).is_err());
        assert!(store.set_selected(None).is_err());
        assert!(store.clear().is_err());

        assert_eq!(store.list(), &[a.clone()]);
        assert_eq!(store.get_selected(), Some(&a));
        let saved = persistence.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.servers, vec![a.clone()]);
        assert_eq!(saved.selected_server_id, Some(a.id.clone()));
    }

    #[test]
    fn test_remove_saves_cleared_dangling_selection() {
        let persistence = Arc::new(FlakyPersistence::default());
        *persistence.saved.lock().unwrap() = Some(PersistedConfig {
            servers: Vec::new(),
            selected_server_id: Some("gone".into()),
        });
        let mut store = ServerConfigStore::open(ConfigScope::Project, persistence.clone()).unwrap();
        assert_eq!(store.selected_id(), Some("gone"));

        assert!(!store.remove("gone").unwrap());
        assert_eq!(store.selected_id(), None);
        let saved = persistence.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.selected_server_id, None);
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let dir = tempdir().unwrap();
        let persistence = JsonFileConfigPersistence::new(dir.path());
        std::fs::write(persistence.file_path(ConfigScope::Project), "{not json").unwrap();
        let err = persistence.load(ConfigScope::Project).unwrap_err();
        assert!(matches!(err, AppError::Persistence { .. }));
    }
}
