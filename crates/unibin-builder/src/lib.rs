//! Carrier build orchestration
//!
//! Producing a carrier means compiling the runtime once with a placeholder
//! of the requested bucket installed in its internal module table. All the
//! real work happens in external tools (configure, make, patch); this crate
//! only stages the source tree and drives those tools in order. The compile
//! itself may run for many minutes and is treated as opaque: it is never
//! interrupted mid-build, only cancelled with the whole process.
//!
//! Carrier production and payload patching stay decoupled on purpose: the
//! only things they share are the carrier identifier and the reproducible
//! placeholder content from `unibin-core`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use unibin_core::placeholder;
use unibin_registry::{CarrierId, Platform};

/// Relative path of the reserved module's source file inside the runtime
/// tree. Its content becomes the module table entry the patcher targets.
pub const RESERVED_MODULE_FILE: &str = "lib/_unibin_app_main.js";

/// Relative path the bootstrap entry file is installed at.
pub const BOOTSTRAP_ENTRY_FILE: &str = "lib/_third_party_main.js";

/// Errors from carrier production
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error while staging the source tree
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An external build tool exited unsuccessfully
    #[error("{tool} failed with {status}")]
    ToolFailed { tool: String, status: String },

    /// The build finished but the expected executable is missing
    #[error("build produced no executable at {0}")]
    MissingResult(PathBuf),
}

/// External toolchain commands for one target platform.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub configure: String,
    pub configure_args: Vec<String>,
    pub make: String,
    pub make_args: Vec<String>,
}

impl Toolchain {
    /// Default toolchain for a platform: `vcbuild.bat` on Windows, else
    /// `./configure` plus parallel `make`.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => Self {
                configure: String::new(),
                configure_args: Vec::new(),
                make: "vcbuild.bat".to_string(),
                make_args: vec!["x64".to_string(), "no-cctest".to_string()],
            },
            _ => Self {
                configure: "./configure".to_string(),
                configure_args: Vec::new(),
                make: "make".to_string(),
                make_args: vec![format!("-j{}", num_cpus::get())],
            },
        }
    }
}

/// One carrier production run over an already unpacked runtime source tree.
#[derive(Debug)]
pub struct CarrierBuild {
    /// Identifier the finished carrier will be stored under.
    pub id: CarrierId,
    /// Root of the runtime source tree.
    pub source_dir: PathBuf,
    /// Patch files applied to the tree before building.
    pub patches: Vec<PathBuf>,
    /// Toolchain used to compile the tree.
    pub toolchain: Toolchain,
    /// Where the toolchain leaves the compiled executable, relative to
    /// `source_dir`.
    pub result_path: PathBuf,
}

impl CarrierBuild {
    pub fn new(id: CarrierId, source_dir: impl Into<PathBuf>) -> Self {
        let toolchain = Toolchain::for_platform(id.platform);
        let result_path = match id.platform {
            Platform::Windows => PathBuf::from("Release/node.exe"),
            _ => PathBuf::from("out/Release/node"),
        };
        Self {
            id,
            source_dir: source_dir.into(),
            patches: Vec::new(),
            toolchain,
            result_path,
        }
    }

    /// Stage the tree: install the bootstrap entry file and write the
    /// reserved module's placeholder content for this build's bucket.
    pub fn stage(&self, bootstrap_entry: &[u8]) -> Result<(), BuildError> {
        self.write_tree_file(BOOTSTRAP_ENTRY_FILE, bootstrap_entry)?;
        self.install_module_content(&placeholder(self.id.bucket))
    }

    /// Write the reserved module's source file. Used with placeholder
    /// content for cacheable carriers, or with a real encoded payload for
    /// direct single-application builds.
    pub fn install_module_content(&self, content: &[u8]) -> Result<(), BuildError> {
        self.write_tree_file(RESERVED_MODULE_FILE, content)
    }

    fn write_tree_file(&self, rel: &str, content: &[u8]) -> Result<(), BuildError> {
        let path = self.source_dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply the distribution patch set with the external `patch` tool.
    pub fn apply_patches(&self) -> Result<(), BuildError> {
        for patch_file in &self.patches {
            let status = Command::new("patch")
                .args(["-p1", "-i"])
                .arg(patch_file)
                .current_dir(&self.source_dir)
                .status()?;
            if !status.success() {
                return Err(BuildError::ToolFailed {
                    tool: format!("patch -i {}", patch_file.display()),
                    status: status.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Run configure and make. Blocks for the duration of the compile.
    pub fn compile(&self) -> Result<PathBuf, BuildError> {
        if !self.toolchain.configure.is_empty() {
            self.run_tool(&self.toolchain.configure, &self.toolchain.configure_args)?;
        }
        self.run_tool(&self.toolchain.make, &self.toolchain.make_args)?;

        let result = self.source_dir.join(&self.result_path);
        if !result.exists() {
            return Err(BuildError::MissingResult(result));
        }
        Ok(result)
    }

    fn run_tool(&self, tool: &str, args: &[String]) -> Result<(), BuildError> {
        let status = Command::new(tool)
            .args(args)
            .current_dir(&self.source_dir)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(BuildError::ToolFailed {
                tool: tool.to_string(),
                status: status.to_string(),
            })
        }
    }

    /// Stage, patch, compile and read back the carrier bytes.
    pub fn produce(&self, bootstrap_entry: &[u8]) -> Result<Vec<u8>, BuildError> {
        self.stage(bootstrap_entry)?;
        self.apply_patches()?;
        let result = self.compile()?;
        Ok(fs::read(result)?)
    }
}
