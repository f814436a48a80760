use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".letex"))
            .unwrap_or_else(|| PathBuf::from(".letex"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// SQLite database holding threads and notes.
    pub fn store_db(&self) -> PathBuf {
        self.base.join("letex.db")
    }

    pub fn browser_state_file(&self) -> PathBuf {
        self.base.join("browser_state.json")
    }

    pub fn identity_file(&self) -> PathBuf {
        self.base.join("identity.json")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
