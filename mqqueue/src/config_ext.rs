//! Extension de mqconfig pour les files

use anyhow::Result;
use std::path::PathBuf;

/// Trait d'extension pour mqconfig::Config
pub trait QueueConfigExt {
    /// Retourne le chemin de la base de données des files
    fn queue_db_path(&self) -> Result<PathBuf>;
}

impl QueueConfigExt for mqconfig::Config {
    fn queue_db_path(&self) -> Result<PathBuf> {
        // Le répertoire est créé s'il n'existe pas
        let queues_dir = self.get_managed_dir(&["queues", "directory"], "queues")?;
        Ok(PathBuf::from(queues_dir).join("queues.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqconfig::Config;

    #[test]
    fn test_db_path_is_in_managed_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        let path = config.queue_db_path().unwrap();
        assert!(path.ends_with("queues/queues.db"));
        assert!(path.parent().unwrap().is_dir());
    }
}
