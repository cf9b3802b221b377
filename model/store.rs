use super::artifact::{ModelArtifact, ModelError};
use super::network::LoadedModel;
use ahash::AHashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Loads models by name from a directory of `<name>.toml` files.
///
/// Each model is read and validated once; later requests for the same name
/// share the same immutable instance.
#[derive(Debug)]
pub struct ModelStore {
    dir: PathBuf,
    cache: AHashMap<String, Arc<LoadedModel>>,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: AHashMap::new(),
        }
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, ModelError> {
        let is_plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        if !is_plain {
            return Err(ModelError::InvalidModelName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.toml")))
    }

    pub fn get(&mut self, name: &str) -> Result<Arc<LoadedModel>, ModelError> {
        if let Some(model) = self.cache.get(name) {
            log::debug!("Reusing cached model '{name}'");
            return Ok(Arc::clone(model));
        }

        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ModelError::ModelNotFound {
                name: name.to_string(),
                path: path.display().to_string(),
            });
        }
        log::info!("Loading model '{name}' from {}", path.display());
        let artifact = ModelArtifact::load(&path)?;
        let model = Arc::new(LoadedModel::from_artifact(artifact)?);
        self.cache.insert(name.to_string(), Arc::clone(&model));
        Ok(model)
    }
}
