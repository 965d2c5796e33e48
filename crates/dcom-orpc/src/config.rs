//! Codec configuration

use crate::types::ComVersion;

/// How ORPCTHIS writes its extension chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionLayout {
    /// `[unique]` pointer to ORPC_EXTENT_ARRAY, records behind their own
    /// pointers. Same shape the decoder reads; an absent chain and an empty
    /// one stay distinguishable.
    #[default]
    Deferred,
    /// `count, reserved, (id, size, data)*` with no pointers at all. An empty
    /// chain is written like an absent one, as a single zero count.
    Flat,
}

/// Settings shared by the ORPC encode and decode paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrpcConfig {
    /// Version stamped on ORPCTHIS headers built with [`OrpcThis::with_config`](crate::OrpcThis::with_config)
    pub com_version: ComVersion,
    pub extension_layout: ExtensionLayout,
    /// Largest extension count accepted on decode
    pub max_extensions: usize,
}

impl Default for OrpcConfig {
    fn default() -> Self {
        Self {
            com_version: ComVersion::DCOM_5_7,
            extension_layout: ExtensionLayout::Deferred,
            max_extensions: 1024,
        }
    }
}

impl OrpcConfig {
    pub fn with_version(com_version: ComVersion) -> Self {
        Self {
            com_version,
            ..Self::default()
        }
    }
}
