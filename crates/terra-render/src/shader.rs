//! Shader module registry.

use log::{debug, info};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use wgpu::{ShaderModuleDescriptor, ShaderSource};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShaderError {
    #[error("shader '{name}' not found in library")]
    NotLoaded { name: String },
}

/// Compiled shader modules keyed by name.
pub struct ShaderLibrary {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Compile WGSL source under `name`, replacing any module of that name.
    pub fn load_from_source(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        source: &str,
    ) -> Arc<wgpu::ShaderModule> {
        debug!("Compiling shader '{name}' ({} bytes)", source.len());

        let module = Arc::new(device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        }));

        if self
            .modules
            .insert(name.to_string(), Arc::clone(&module))
            .is_some()
        {
            info!("Replaced shader '{name}'");
        } else {
            info!("Loaded shader '{name}'");
        }
        module
    }

    pub fn get(&self, name: &str) -> Option<Arc<wgpu::ShaderModule>> {
        self.modules.get(name).cloned()
    }

    /// Like [`get`](Self::get), but a missing module is an error.
    pub fn require(&self, name: &str) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        self.get(name).ok_or_else(|| ShaderError::NotLoaded {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    const VALID_SHADER: &str = r#"
        @vertex
        fn vs_main(@builtin(vertex_index) idx: u32) -> @builtin(position) vec4<f32> {
            return vec4<f32>(0.0, 0.0, 0.0, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    #[test]
    fn test_new_library_is_empty() {
        let library = ShaderLibrary::default();
        assert!(library.is_empty());
        assert!(library.get("missing").is_none());
        assert_eq!(
            library.require("missing").err(),
            Some(ShaderError::NotLoaded {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_load_and_replace() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let first = library.load_from_source(&device, "basic", VALID_SHADER);
        let second = library.load_from_source(&device, "basic", VALID_SHADER);
        assert_eq!(library.len(), 1);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&library.require("basic").unwrap(), &second));
    }
}
