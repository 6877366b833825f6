// Shader module loading
//
// SPIR-V bytecode comes from a `ShaderSource` (files on disk by default) and
// is turned into transient shader modules. A `ShaderModule` destroys itself
// when dropped, so modules never outlive pipeline creation even when it fails.

use ash::vk;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use super::error::{ContextError, ContextResult, ShaderLoadError};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Supplies raw compiled-shader bytes for a resource path.
pub trait ShaderSource {
    fn load(&self, path: &Path) -> Result<Vec<u8>, ShaderLoadError>;
}

/// Reads shaders from files below a root directory.
#[derive(Debug, Clone)]
pub struct FileShaderSource {
    root: PathBuf,
}

impl FileShaderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShaderSource for FileShaderSource {
    fn load(&self, path: &Path) -> Result<Vec<u8>, ShaderLoadError> {
        let full_path = self.root.join(path);
        log::debug!("Loading shader {:?}", full_path);

        std::fs::read(&full_path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ShaderLoadError::ResourceNotFound(full_path.clone()),
            _ => ShaderLoadError::Read {
                path: full_path.clone(),
                source,
            },
        })
    }
}

/// Load `path` from `source` and decode it into aligned SPIR-V words.
pub fn load_spirv(source: &dyn ShaderSource, path: &Path) -> Result<Vec<u32>, ShaderLoadError> {
    let bytes = source.load(path)?;
    let invalid = |source| ShaderLoadError::InvalidBytecode {
        path: path.to_path_buf(),
        source,
    };

    let words = ash::util::read_spv(&mut Cursor::new(&bytes)).map_err(invalid)?;
    if words.first() != Some(&SPIRV_MAGIC) {
        return Err(invalid(io::Error::new(
            io::ErrorKind::InvalidData,
            "missing SPIR-V magic number",
        )));
    }

    Ok(words)
}

/// Shader module that lives only as long as this guard.
pub struct ShaderModule<'a> {
    pub handle: vk::ShaderModule,
    device: &'a ash::Device,
}

impl<'a> ShaderModule<'a> {
    pub fn new(device: &'a ash::Device, code: &[u32]) -> ContextResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);

        let handle = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(ContextError::ShaderModuleCreation)?;

        Ok(Self { handle, device })
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.handle, None);
        }
    }
}
